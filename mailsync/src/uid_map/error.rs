use std::{any::Any, io, path::PathBuf, result};

use thiserror::Error;

use crate::{id::Id, AnyBoxedError, AnyError, Severity};

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot find UID mapping file for folder {1}, repository {2} at {0}")]
    MappingUnavailableError(PathBuf, String, String),
    #[error("corrupt line {0:?} in UID mapping file, folder {1} (repository {2})")]
    MappingCorruptError(String, String, String),
    #[error("cannot translate unknown remote UID {0} of folder {1} (repository {2})")]
    UnknownRemoteIdError(Id, String, String),
    #[error("cannot read UID mapping file at {1}")]
    ReadMapFileError(#[source] io::Error, PathBuf),
    #[error("cannot write UID mapping file at {1}")]
    WriteMapFileError(#[source] io::Error, PathBuf),
    #[error("cannot replace UID mapping file {1} with {2}")]
    ReplaceMapFileError(#[source] io::Error, PathBuf, PathBuf),
    #[error("cannot create UID mapping file at {1}")]
    CreateMapFileError(#[source] io::Error, PathBuf),
}

impl Error {
    /// Return how far the error reaches.
    ///
    /// Mapping file errors stop the owning folder for the whole pass
    /// and are reported at repository level. An unknown remote UID is
    /// a consistency error scoped to its folder.
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnknownRemoteIdError(..) => Severity::Folder,
            _ => Severity::Repository,
        }
    }
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
