//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("parameter index {index} out of bounds ({len} parameters)")]
    IndexOutOfRange { index: usize, len: usize },
}
