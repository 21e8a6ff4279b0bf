use std::{any::Any, io, path::PathBuf, result};

use thiserror::Error;

use crate::{AnyBoxedError, AnyError};

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot find synchronization metadata directory")]
    GetMetadataDirError,
    #[error("cannot create synchronization metadata directory at {1}")]
    CreateMetadataDirError(#[source] io::Error, PathBuf),
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
