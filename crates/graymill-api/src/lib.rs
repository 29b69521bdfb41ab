//! Graymill API Library
//!
//! The producer half of the pipeline: HTTP upload surface and gallery view.
//! Uploads store the raw image, enqueue a processing request, and return the
//! predicted processed-object address; the worker fills that address in
//! asynchronously.

mod handlers;
mod routes;

pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use routes::build_router;
pub use state::AppState;
