//! Graymill Worker Library
//!
//! The consumer half of the pipeline: receives processing requests from the
//! queue, performs the idempotent transform-and-publish, and resolves every
//! delivery exactly once.

pub mod worker;

pub use worker::{ImageWorker, Outcome, WorkerConfig};
