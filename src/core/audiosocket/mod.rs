//! Binary audio framing spoken between the PBX media channel and this service.
//!
//! Every frame starts with a one-byte kind. Inbound frames from the PBX carry a
//! big-endian `u16` payload length after the kind; outbound audio frames produced
//! by [`wrap_pcm16`] carry the big-endian sample count instead, followed by the
//! signed 16-bit little-endian PCM bytes.
//!
//! | Kind   | Byte   | Payload                                   |
//! |--------|--------|-------------------------------------------|
//! | hangup | `0x00` | none                                      |
//! | identify | `0x01` | 16-byte binary UUID (or its text form) |
//! | audio  | `0x10` | 8 kHz mono PCM16                          |
//! | error  | `0xff` | optional vendor-specific error code       |
//!
//! # Example
//! ```rust,ignore
//! use tts_manager::core::audiosocket::{downsample, wrap_pcm16};
//!
//! let pcm_8k = downsample(&pcm_16k, 16000, 8000)?;
//! let frame = wrap_pcm16(&pcm_8k[..320])?;
//! ```

mod frame;
mod resample;
mod sink;

use thiserror::Error;

pub use frame::{Frame, FrameKind, HEADER_LEN, read_frame, wrap_pcm16};
pub use resample::{OUTPUT_SAMPLE_RATE, downsample};
pub use sink::{AudioSink, BoxedWriter, FRAME_BYTES};

/// Result type for audio framing operations
pub type AudioSocketResult<T> = Result<T, AudioSocketError>;

#[derive(Error, Debug)]
pub enum AudioSocketError {
    #[error("Invalid audio data: {0}")]
    InvalidAudio(String),

    #[error("Unsupported sample rate conversion: {input} Hz to {output} Hz")]
    UnsupportedSampleRate { input: u32, output: u32 },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown frame kind: 0x{0:02x}")]
    UnknownKind(u8),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
