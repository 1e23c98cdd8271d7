//! Kitha Serve
//!
//! The prediction service: one exported bundle loaded at startup and
//! shared by every request.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod resolve;
pub mod server;

pub use config::ServeConfig;
pub use context::{ModelContext, Prediction, MAX_TEXT_CHARS};
pub use error::{PredictError, ServeError, ServeResult};
pub use resolve::{resolve, ModelSource};
pub use server::{router, run, ServiceState};
