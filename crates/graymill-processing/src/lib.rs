//! Graymill Processing Library
//!
//! The deterministic image transform applied by the worker: grayscale
//! conversion with a format-preserving re-encode. Pure function of the input
//! bytes; the invocation contract is `raw bytes in -> processed bytes +
//! format out`.

pub mod grayscale;

pub use grayscale::{GrayscaleTransformer, ProcessingError};
