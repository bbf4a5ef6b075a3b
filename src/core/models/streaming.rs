//! Runtime streaming session model and the vendor/gender enums it carries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::speaking::{Direction, ReferenceType};

/// Supported TTS vendors. Only `ElevenLabs` has a working adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorName {
    #[serde(rename = "elevenlabs")]
    ElevenLabs,
    Aws,
    Gcp,
}

impl VendorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElevenLabs => "elevenlabs",
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }
}

impl fmt::Display for VendorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VendorName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "elevenlabs" | "eleven_labs" | "eleven-labs" => Ok(Self::ElevenLabs),
            "aws" | "polly" => Ok(Self::Aws),
            "gcp" | "google" => Ok(Self::Gcp),
            other => Err(format!("unknown vendor: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Neutral,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }
}

/// A live streaming session known to this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaming {
    pub id: Uuid,
    pub customer_id: Uuid,

    pub reference_type: ReferenceType,
    pub reference_id: Uuid,

    pub language: String,
    pub gender: Gender,
    pub vendor: VendorName,
    pub voice_id: String,
    pub direction: Direction,

    /// Flow execution the call belongs to, used for per-call voice variables.
    pub activeflow_id: Option<Uuid>,
    pub pod_id: String,
}
