use std::{any::Any, result};

use thiserror::Error;

use crate::{id::Id, AnyBoxedError, AnyError};

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot create folder {0} on repository {1}: folder already exists")]
    FolderAlreadyExistsError(String, String),
    #[error("cannot find folder {0} on repository {1}")]
    FolderNotFoundError(String, String),
    #[error("cannot find message {0} in folder {1}")]
    MessageNotFoundError(Id, String),
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
