//! Mock vendor servers for integration tests
//!
//! - WebSocket (ElevenLabs `stream-input`)

// Each test binary uses a different subset of the helpers
#![allow(dead_code)]

pub mod elevenlabs_mock;

pub use elevenlabs_mock::{ElevenLabsMock, ElevenLabsMockState, MockBehavior};
