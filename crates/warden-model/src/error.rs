use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid admin address {input:?}: {reason}")]
    InvalidAdminAddress { input: String, reason: &'static str },
    #[error("invalid run options: {0}")]
    InvalidOptions(&'static str),
}
