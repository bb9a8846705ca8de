use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),
    #[error("'{name}' is a {actual}, not a {expected}")]
    WrongCategory {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: String, reason: String },
}
