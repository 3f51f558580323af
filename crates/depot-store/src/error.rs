use depot_graph::GraphError;
use depot_types::TypeError;
use depot_values::ValueError;
use thiserror::Error;

/// Errors raised by repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: '{0}'")]
    NotFound(String),

    #[error("an object named '{0}' already exists (store with overwrite to replace it)")]
    DuplicateHandle(String),

    #[error("object '{handle}' cannot be converted to {wanted}: stored class is {found}")]
    TypeMismatch {
        handle: String,
        wanted: &'static str,
        found: String,
    },

    #[error("expansion of '{handle}' exceeded {limit} levels of nesting, object graph may be cyclic")]
    RecursionLimitExceeded { handle: String, limit: usize },

    #[error("invalid handle pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("dependency graph error: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type StoreResult<T> = Result<T, StoreError>;
