//! Error types for the animatic pipeline.
//!
//! # Error Hierarchy
//!
//! Errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - [`AnimaticError`] boxes any of them for propagation with `?`
//!
//! Only [`JobError`] is non-retryable. Stage errors end one render attempt;
//! the attempt loop decides whether the job continues.
//!
//! # Examples
//!
//! ```
//! use animatic_error::{AnimaticResult, JobError, JobErrorKind};
//!
//! fn give_up() -> AnimaticResult<()> {
//!     Err(JobError::new(JobErrorKind::UnfixableScript("empty script".into())))?
//! }
//!
//! let err = give_up().unwrap_err();
//! assert!(err.is_non_retryable());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod checkpoint;
mod config;
mod error;
mod generation;
mod job;
mod sandbox;
mod stage;

pub use checkpoint::{CheckpointError, CheckpointErrorKind};
pub use config::ConfigError;
pub use error::{AnimaticError, AnimaticErrorKind, AnimaticResult, GENERIC_FAILURE_MESSAGE};
pub use generation::{GenerationError, GenerationErrorKind};
pub use job::{JobError, JobErrorKind};
pub use sandbox::{SandboxError, SandboxErrorKind};
pub use stage::StageError;
