//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `speakings` - Speaking session lifecycle

pub mod api;
pub mod speakings;
