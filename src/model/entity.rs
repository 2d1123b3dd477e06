//! Entity records, relation descriptors, and inline sub-entity stubs

use crate::model::TimeSpan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of an archive entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Band,
    Artist,
    Label,
    Release,
}

impl EntityKind {
    /// Recovers the kind from a reference's leading path segment,
    /// e.g. `"bands/wyrm/42"` is a band.
    pub fn from_reference(reference: &str) -> Option<Self> {
        let prefix = reference.split('/').next()?;
        match prefix {
            "bands" => Some(Self::Band),
            "artists" => Some(Self::Artist),
            "labels" => Some(Self::Label),
            "releases" => Some(Self::Release),
            _ => None,
        }
    }

    /// Parses the singular kind name used in config seed entries.
    pub fn from_config_string(s: &str) -> Option<Self> {
        match s {
            "band" => Some(Self::Band),
            "artist" => Some(Self::Artist),
            "label" => Some(Self::Label),
            "release" => Some(Self::Release),
            _ => None,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Band => "band",
            Self::Artist => "artist",
            Self::Label => "label",
            Self::Release => "release",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::from_config_string(s)
    }

    pub fn all_kinds() -> Vec<Self> {
        vec![Self::Band, Self::Artist, Self::Label, Self::Release]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// A normalized entity produced from one fetched document
///
/// The source reference doubles as the entity id: it is unique per entity
/// and stable across runs. Kind-specific detail fields are explicit options;
/// an absent field is `None`, never a missing key.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub reference: String,
    pub name: String,
    pub visited_at: DateTime<Utc>,

    // Band details
    pub country: Option<String>,
    pub genre: Option<String>,
    pub formed_year: Option<u16>,

    // Artist details
    pub real_name: Option<String>,
    pub birthplace: Option<String>,

    // Release details
    pub release_year: Option<u16>,
    pub label_name: Option<String>,

    /// Sub-entities referenced inline by this document but not committed as
    /// full records (either unresolvable or deliberately left for a later
    /// work item).
    pub stubs: Vec<EntityStub>,
}

impl EntityRecord {
    /// A record with only the shared field set populated.
    pub fn new(kind: EntityKind, reference: &str, name: &str) -> Self {
        Self {
            kind,
            reference: reference.to_string(),
            name: name.to_string(),
            visited_at: Utc::now(),
            country: None,
            genre: None,
            formed_year: None,
            real_name: None,
            birthplace: None,
            release_year: None,
            label_name: None,
            stubs: Vec::new(),
        }
    }
}

/// Status category of a relation between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationStatus {
    Current,
    Past,
    Session,
    Live,
    Unknown,
}

impl RelationStatus {
    /// Parses the section class the archive uses on lineup rows.
    pub fn from_section_class(s: &str) -> Self {
        match s {
            "current" => Self::Current,
            "past" => Self::Past,
            "session" => Self::Session,
            "live" => Self::Live,
            _ => Self::Unknown,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Past => "past",
            Self::Session => "session",
            Self::Live => "live",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "current" => Some(Self::Current),
            "past" => Some(Self::Past),
            "session" => Some(Self::Session),
            "live" => Some(Self::Live),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for RelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// One relation between two entities
///
/// Not unique per (subject, object): the same pair may carry several role
/// entries, e.g. two separate stints in the same band.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDescriptor {
    pub subject_ref: String,
    pub object_ref: String,
    pub role: String,
    pub status: RelationStatus,
    pub spans: Vec<TimeSpan>,
}

/// A sub-entity discovered inline: referenced but not yet fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStub {
    pub kind: EntityKind,
    pub reference: String,
    pub name: String,
}
