//! Wire messages of the ElevenLabs `stream-input` WebSocket API.

use serde::{Deserialize, Serialize};

/// Text chunk sent to the vendor.
///
/// An empty `text` closes the input stream; the vendor then sends the remaining
/// audio followed by a message with `isFinal` set.
#[derive(Debug, Clone, Serialize)]
pub struct TextMessage<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub try_trigger_generation: Option<bool>,
    pub flush: bool,
}

impl<'a> TextMessage<'a> {
    pub fn new(text: &'a str, flush: bool) -> Self {
        Self {
            text,
            try_trigger_generation: None,
            flush,
        }
    }
}

/// Character alignment for a chunk of audio.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alignment {
    #[serde(default)]
    pub chars: Vec<String>,
    #[serde(default)]
    pub char_start_times_ms: Vec<u64>,
    #[serde(default)]
    pub chars_durations_ms: Vec<u64>,
}

impl Alignment {
    pub fn text(&self) -> String {
        self.chars.concat()
    }
}

/// Message received from the vendor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    /// Base64 PCM16 audio
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub is_final: Option<bool>,
    #[serde(default)]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub normalized_alignment: Option<Alignment>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StreamResponse {
    pub fn is_final(&self) -> bool {
        self.is_final.unwrap_or(false)
    }

    /// Vendor-reported error, with the detail message when present.
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_deref().filter(|e| !e.is_empty())?;
        Some(match self.message.as_deref() {
            Some(detail) if !detail.is_empty() => format!("{error}: {detail}"),
            _ => error.to_string(),
        })
    }

    /// Original-text alignment, falling back to the normalized one.
    pub fn alignment_text(&self) -> Option<String> {
        self.alignment
            .as_ref()
            .or(self.normalized_alignment.as_ref())
            .map(Alignment::text)
    }
}
