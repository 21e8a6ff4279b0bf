//! Rust library to keep a remote mailbox and a local one in sync.
//!
//! Both sides of a synchronization assign their own identifiers
//! (UIDs) to messages. The core of this library is the machinery that
//! keeps those two identifier spaces consistent:
//!
//! - [`uid_map`] holds the durable, crash-safe mapping between remote
//!   and local identifiers of a folder.
//!
//! - [`folder::mapped::MappedFolder`] wraps a local folder so that
//!   every operation speaks remote identifiers.
//!
//! - [`folder::sync`] creates on each side the folders only the other
//!   side knows about.
//!
//! - [`task`] runs many folder synchronizations in parallel while
//!   respecting a hard cap of simultaneous sessions per repository.
//!
//! The [`sync::SyncBuilder`] glues everything together. Repositories
//! and folders are external collaborators exposed as the
//! [`repository::Repository`] and [`folder::MessageFolder`]
//! capabilities; an in-memory implementation lives in [`memory`].

pub mod config;
mod error;
pub mod flag;
pub mod folder;
pub mod id;
pub mod memory;
pub mod message;
pub mod repository;
pub mod sync;
pub mod task;
pub mod uid_map;

#[doc(inline)]
pub use self::error::{AnyBoxedError, AnyError, AnyResult, Severity};
