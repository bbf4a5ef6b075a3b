//! Durable speaking record and the typed field map used to filter and update it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider used when a create request leaves the provider empty.
pub const DEFAULT_PROVIDER: &str = "elevenlabs";

/// What a speaking session is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Call,
    Confbridge,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Confbridge => "confbridge",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "confbridge" => Ok(Self::Confbridge),
            other => Err(format!("unknown reference type: {other}")),
        }
    }
}

/// Which leg of the call hears the synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    #[default]
    Out,
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

/// Lifecycle status of a speaking record. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Initiating,
    Active,
    Stopped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiating => "initiating",
            Self::Active => "active",
            Self::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initiating" => Ok(Self::Initiating),
            "active" => Ok(Self::Active),
            "stopped" => Ok(Self::Stopped),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// A speaking session as persisted by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaking {
    pub id: Uuid,
    pub customer_id: Uuid,

    pub reference_type: ReferenceType,
    pub reference_id: Uuid,

    pub language: String,
    pub provider: String,
    pub voice_id: String,
    pub direction: Direction,

    pub status: Status,
    /// Process instance that owns the live transport session.
    pub pod_id: String,

    pub tm_create: Option<DateTime<Utc>>,
    pub tm_update: Option<DateTime<Utc>>,
    pub tm_delete: Option<DateTime<Utc>>,
}

impl Speaking {
    pub fn is_deleted(&self) -> bool {
        self.tm_delete.is_some()
    }

    /// Returns true when every filter in `filters` holds for this record.
    pub fn matches(&self, filters: &Fields) -> bool {
        filters.iter().all(|(field, value)| match (field, value) {
            (Field::CustomerId, FieldValue::Uuid(v)) => self.customer_id == *v,
            (Field::ReferenceType, FieldValue::ReferenceType(v)) => self.reference_type == *v,
            (Field::ReferenceId, FieldValue::Uuid(v)) => self.reference_id == *v,
            (Field::Language, FieldValue::Text(v)) => self.language == *v,
            (Field::Provider, FieldValue::Text(v)) => self.provider == *v,
            (Field::VoiceId, FieldValue::Text(v)) => self.voice_id == *v,
            (Field::Direction, FieldValue::Direction(v)) => self.direction == *v,
            (Field::Status, FieldValue::Status(v)) => self.status == *v,
            (Field::PodId, FieldValue::Text(v)) => self.pod_id == *v,
            (Field::Deleted, FieldValue::Bool(v)) => self.is_deleted() == *v,
            _ => false,
        })
    }

    /// Applies an update map. Pairs whose value type does not fit the field are ignored.
    pub fn apply(&mut self, fields: &Fields) {
        for (field, value) in fields {
            match (field, value) {
                (Field::CustomerId, FieldValue::Uuid(v)) => self.customer_id = *v,
                (Field::ReferenceType, FieldValue::ReferenceType(v)) => self.reference_type = *v,
                (Field::ReferenceId, FieldValue::Uuid(v)) => self.reference_id = *v,
                (Field::Language, FieldValue::Text(v)) => self.language = v.clone(),
                (Field::Provider, FieldValue::Text(v)) => self.provider = v.clone(),
                (Field::VoiceId, FieldValue::Text(v)) => self.voice_id = v.clone(),
                (Field::Direction, FieldValue::Direction(v)) => self.direction = *v,
                (Field::Status, FieldValue::Status(v)) => self.status = *v,
                (Field::PodId, FieldValue::Text(v)) => self.pod_id = v.clone(),
                _ => {}
            }
        }
    }
}

/// Column names usable as filters or update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CustomerId,
    ReferenceType,
    ReferenceId,
    Language,
    Provider,
    VoiceId,
    Direction,
    Status,
    PodId,
    /// Filter-only: matches on whether the record carries a delete timestamp.
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Uuid(Uuid),
    Text(String),
    ReferenceType(ReferenceType),
    Direction(Direction),
    Status(Status),
    Bool(bool),
}

pub type Fields = HashMap<Field, FieldValue>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Speaking {
        Speaking {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            reference_type: ReferenceType::Call,
            reference_id: Uuid::new_v4(),
            language: "en-US".to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            voice_id: String::new(),
            direction: Direction::Out,
            status: Status::Active,
            pod_id: "pod-a".to_string(),
            tm_create: Some(Utc::now()),
            tm_update: None,
            tm_delete: None,
        }
    }

    #[test]
    fn test_matches_all_filters() {
        let speaking = sample();
        let filters = Fields::from([
            (Field::CustomerId, FieldValue::Uuid(speaking.customer_id)),
            (Field::ReferenceType, FieldValue::ReferenceType(ReferenceType::Call)),
            (Field::Deleted, FieldValue::Bool(false)),
        ]);
        assert!(speaking.matches(&filters));

        let filters = Fields::from([(Field::Status, FieldValue::Status(Status::Stopped))]);
        assert!(!speaking.matches(&filters));
    }

    #[test]
    fn test_mismatched_value_type_never_matches() {
        let speaking = sample();
        let filters = Fields::from([(Field::CustomerId, FieldValue::Text("x".to_string()))]);
        assert!(!speaking.matches(&filters));
    }

    #[test]
    fn test_apply_updates_status() {
        let mut speaking = sample();
        speaking.apply(&Fields::from([(
            Field::Status,
            FieldValue::Status(Status::Stopped),
        )]));
        assert_eq!(speaking.status, Status::Stopped);
        assert!(speaking.status.is_terminal());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Call".parse::<ReferenceType>().unwrap(), ReferenceType::Call);
        assert_eq!("both".parse::<Direction>().unwrap(), Direction::Both);
        assert_eq!("active".parse::<Status>().unwrap(), Status::Active);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["reference_type"], "call");
        assert_eq!(json["status"], "active");
        assert_eq!(json["direction"], "out");
    }
}
