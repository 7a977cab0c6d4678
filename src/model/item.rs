use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Work item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotStarted,
    WorkInProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [
        Status::NotStarted,
        Status::WorkInProgress,
        Status::Completed,
    ];

    /// Fixed progress weight used for leaves without a recognized substatus
    pub fn weight(self) -> f64 {
        match self {
            Status::NotStarted => 0.0,
            Status::WorkInProgress => 0.5,
            Status::Completed => 1.0,
        }
    }

    /// The wire name (`not_started`, `work_in_progress`, `completed`)
    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::WorkInProgress => "work_in_progress",
            Status::Completed => "completed",
        }
    }

    /// Parse a wire name. Also accepts a few shorthands for the CLI.
    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "not_started" | "todo" | "ns" => Some(Status::NotStarted),
            "work_in_progress" | "wip" => Some(Status::WorkInProgress),
            "completed" | "done" => Some(Status::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained state of a `work_in_progress` leaf.
///
/// Serialized as a plain string. Strings outside the known vocabulary are
/// kept verbatim in `Other` so imported data survives a load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Substatus {
    /// Empty string: work has started but no substatus is chosen yet
    Unset,
    Modeled,
    Quoted,
    /// Completion sentinel, promotes a leaf to `completed`
    Drafted,
    Other(String),
}

impl Substatus {
    /// Progress weight for the recognized, non-empty substatuses
    pub fn weight(&self) -> Option<f64> {
        match self {
            Substatus::Modeled => Some(0.33),
            Substatus::Quoted => Some(0.66),
            Substatus::Unset | Substatus::Drafted | Substatus::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Substatus::Unset => "",
            Substatus::Modeled => "modeled",
            Substatus::Quoted => "quoted",
            Substatus::Drafted => "drafted",
            Substatus::Other(s) => s,
        }
    }

    pub fn is_drafted(&self) -> bool {
        matches!(self, Substatus::Drafted)
    }
}

impl From<String> for Substatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" => Substatus::Unset,
            "modeled" => Substatus::Modeled,
            "quoted" => Substatus::Quoted,
            "drafted" => Substatus::Drafted,
            _ => Substatus::Other(s),
        }
    }
}

impl From<&str> for Substatus {
    fn from(s: &str) -> Self {
        Substatus::from(s.to_string())
    }
}

impl From<Substatus> for String {
    fn from(s: Substatus) -> Self {
        match s {
            Substatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Substatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dated note on a work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub date: NaiveDate,
    pub text: String,
}

/// One node of the shop's fabrication breakdown, stored flat.
///
/// The parent/child structure lives only in `parent_id`; see
/// [`crate::ops::tree::build_tree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub substatus: Option<Substatus>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl WorkItem {
    /// A fresh, not-started item
    pub fn new(id: impl Into<String>, description: impl Into<String>, parent_id: Option<String>) -> Self {
        WorkItem {
            id: id.into(),
            description: description.into(),
            parent_id,
            status: Status::NotStarted,
            substatus: None,
            notes: Vec::new(),
        }
    }

    /// No parent, or an empty `parent_id`
    pub fn is_root(&self) -> bool {
        self.parent_id.as_deref().is_none_or(str::is_empty)
    }
}
