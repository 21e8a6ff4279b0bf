//! # Message module
//!
//! Module dedicated to messages. The only operation implemented here
//! is the synchronization of the messages of a folder pair, see
//! [`sync`].

pub mod sync;

#[doc(inline)]
pub use self::sync::MessageSyncReport;
