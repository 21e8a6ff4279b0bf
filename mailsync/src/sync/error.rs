use std::{any::Any, io, path::PathBuf, result};

use advisory_lock::FileLockError;
use thiserror::Error;

use crate::{config, folder, task, AnyBoxedError, AnyError};

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open sync lock file at {1}")]
    OpenLockFileError(#[source] io::Error, PathBuf),
    #[error("cannot lock sync file at {1}")]
    LockFileError(#[source] FileLockError, PathBuf),
    #[error("cannot unlock sync file at {1}")]
    UnlockFileError(#[source] FileLockError, PathBuf),
    #[error("cannot get sync metadata directory")]
    GetMetadataDirError(#[source] config::Error),
    #[error("cannot initialize permits of repository {1}")]
    InitPermitsError(#[source] task::Error, String),
    #[error("cannot sync folders")]
    SyncFoldersError(#[source] folder::Error),
    #[error("cannot start sync of folder {1}")]
    StartFolderTaskError(#[source] task::Error, String),
}

impl AnyError for Error {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl From<Error> for AnyBoxedError {
    fn from(err: Error) -> Self {
        Box::new(err)
    }
}
