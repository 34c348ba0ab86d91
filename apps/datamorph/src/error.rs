//! Application-level errors.

use datamorph_core::DataModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// A compiler or I/O failure.
    #[error(transparent)]
    Model(#[from] DataModelError),

    /// `--strict` and the run reported error issues.
    #[error("{errors} error issue(s) reported in strict mode")]
    Strict { errors: usize },
}
