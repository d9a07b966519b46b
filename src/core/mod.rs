//! Core types shared across the client

mod error;

pub use error::{OrchestratorError, Result};
