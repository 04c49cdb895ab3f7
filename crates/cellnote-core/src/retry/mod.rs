//! Retry module: backoff policy and the per-task retry controller.

mod controller;
mod policy;

pub use controller::{RetryController, RetryReport};
pub use policy::RetryPolicy;
