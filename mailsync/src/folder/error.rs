use std::{any::Any, result, sync::Arc};

use thiserror::Error;

use crate::{id::Id, AnyBoxedError, AnyError};

/// The global `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The global `Error` enum of the module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot save message {0} to folder {2} (repository {3}): store returned invalid UID {1}")]
    BackendAssignmentError(Id, Id, String, String),
    #[error("cannot confirm placeholder {0} of folder {2} with unconfirmed UID {1}")]
    ConfirmUnconfirmedIdError(Id, Id, String),
    #[error("cannot confirm placeholder {0} of folder {2}: remote UID {1} already mapped")]
    ConfirmMappedIdError(Id, Id, String),
    #[error("cannot list folders of repository {1}")]
    ListFoldersError(#[source] AnyBoxedError, String),
    #[error("cannot create folder {1} on repository {2}")]
    CreateFolderError(#[source] Arc<AnyBoxedError>, String, String),
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
