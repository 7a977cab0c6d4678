use serde::{Deserialize, Serialize};

use super::item::WorkItem;

/// A named project, as written by export and read by import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub items: Vec<WorkItem>,
}

impl Project {
    pub fn new(name: impl Into<String>, items: Vec<WorkItem>) -> Self {
        Project {
            name: name.into(),
            items,
        }
    }
}
