use thiserror::Error;

use crate::api::ApiError;

/// Refusals and failures raised by the console controllers
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("An editor is already open for this {0}; close it first")]
    EditorBusy(&'static str),

    #[error("No editor is open")]
    NoEditor,

    #[error("The {0} has not been saved yet")]
    NotPersisted(&'static str),

    #[error("Requirement cannot be converted: {reason}")]
    NotConvertible { reason: String },

    #[error("Item has no unit test steps to turn into a test case")]
    MissingUnitTest,

    #[error("No session is open")]
    NoSession,

    #[error(transparent)]
    Api(#[from] ApiError),
}
