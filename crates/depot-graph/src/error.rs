use depot_types::Handle;
use thiserror::Error;

/// Errors raised by dependency graph operations.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("object '{0}' cannot observe itself")]
    SelfObservation(Handle),

    #[error("node '{node}' lists precedent '{precedent}' but the inverse edge is missing")]
    MissingInverse { node: Handle, precedent: Handle },

    #[error("node '{node}' lists dependent '{dependent}' but the inverse edge is missing")]
    StaleDependent { node: Handle, dependent: Handle },

    #[error("graph serialization failed: {0}")]
    Serialization(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
