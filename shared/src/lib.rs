//! Shared types for the hostel server
//!
//! Domain models, lifecycle rules, error codes and the response envelope
//! used by the server and its tests.

pub mod error;
pub mod message;
pub mod models;
pub mod money;
pub mod types;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode, ErrorKind};
pub use message::{BusMessage, EventType};
pub use types::PaginatedResponse;
