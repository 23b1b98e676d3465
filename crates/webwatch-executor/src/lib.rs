//! `webwatch-executor` — client side of the remote execution service.
//!
//! The service runs a job script (plus variables and modules) and answers with
//! a flat map of dynamically typed results. [`ResultValue`] pins those values
//! down to a small tagged union at the boundary.

pub mod error;
pub mod http;
pub mod inputs;
pub mod service;
pub mod types;

pub use error::ExecError;
pub use http::HttpExecutionService;
pub use inputs::load_request;
pub use service::ExecutionService;
pub use types::{ExecutionJob, JobRequest, ResultValue};
