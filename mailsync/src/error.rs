use std::{any::Any, error, result};

use tokio::task::JoinError;

/// The global any `Result` alias of the library.
///
/// The difference with module `Result`s is that it takes a dynamic
/// error `Box<dyn AnyError>`.
pub type AnyResult<T> = result::Result<T, AnyBoxedError>;

/// The global, dowcastable any `Error` trait of the library.
///
/// This trait is used when an error that is not known at compilation
/// time cannot be placed in a generic due to object-safe trait
/// constraint. The main use case is for repository and folder
/// capabilities, which are implemented outside of this library.
pub trait AnyError: error::Error + Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl AnyError for JoinError {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The global any boxed `Error` alias of the module.
pub type AnyBoxedError = Box<dyn AnyError + Send + 'static>;

impl error::Error for AnyBoxedError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.as_ref().source()
    }
}

impl From<JoinError> for AnyBoxedError {
    fn from(err: JoinError) -> Self {
        Box::new(err)
    }
}

/// The severity of an error.
///
/// Severity tells how far a failure reaches: a message-level error
/// only spoils one message, while a repository-level one stops every
/// folder of the repository for the current pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    Message,
    Folder,
    Repository,
    Run,
}
