use depot_types::TypeError;
use thiserror::Error;

/// Errors raised while interrogating or mutating a value object.
#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    #[error("object '{object_id}' has no property named '{name}'")]
    UnknownProperty { object_id: String, name: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type ValueResult<T> = Result<T, ValueError>;
