use std::collections::HashSet;

use chrono::{Local, NaiveDate};

use crate::model::item::{Note, Status, Substatus, WorkItem};

/// Error type for work item mutations.
///
/// Every rejection happens before the item list is touched.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("parent item not found: {0}")]
    ParentNotFound(String),
    #[error("item {0} already exists")]
    DuplicateId(String),
    #[error("item id must not be empty")]
    EmptyId,
    #[error("item description must not be empty")]
    EmptyDescription,
    #[error("note text must not be empty")]
    EmptyNote,
}

// ---------------------------------------------------------------------------
// Create / delete
// ---------------------------------------------------------------------------

/// Append a new not-started item, as a root or as the last child of `parent_id`.
pub fn add_item(
    items: &mut Vec<WorkItem>,
    parent_id: Option<&str>,
    id: &str,
    description: &str,
) -> Result<(), ItemError> {
    let id = id.trim();
    let description = description.trim();
    let parent_id = parent_id.filter(|parent| !parent.is_empty());
    if id.is_empty() {
        return Err(ItemError::EmptyId);
    }
    if items.iter().any(|it| it.id == id) {
        return Err(ItemError::DuplicateId(id.to_string()));
    }
    if description.is_empty() {
        return Err(ItemError::EmptyDescription);
    }
    if let Some(parent) = parent_id
        && !items.iter().any(|it| it.id == parent)
    {
        return Err(ItemError::ParentNotFound(parent.to_string()));
    }

    items.push(WorkItem::new(id, description, parent_id.map(String::from)));
    Ok(())
}

/// Remove an item and all of its descendants. Returns the removed ids in
/// list order.
pub fn delete_item(items: &mut Vec<WorkItem>, id: &str) -> Result<Vec<String>, ItemError> {
    if !items.iter().any(|it| it.id == id) {
        return Err(ItemError::NotFound(id.to_string()));
    }
    let doomed = descendants(items, id);
    let removed = items
        .iter()
        .filter(|it| doomed.contains(&it.id))
        .map(|it| it.id.clone())
        .collect();
    items.retain(|it| !doomed.contains(&it.id));
    Ok(removed)
}

/// `id` plus every item whose parent chain leads to it.
///
/// Expands the set until no item's parent is in it and the item isn't, which
/// also terminates on parent cycles.
pub fn descendants(items: &[WorkItem], id: &str) -> HashSet<String> {
    let mut ids = HashSet::from([id.to_string()]);
    let mut changed = true;
    while changed {
        changed = false;
        for it in items {
            if let Some(parent) = &it.parent_id
                && ids.contains(parent)
                && !ids.contains(&it.id)
            {
                ids.insert(it.id.clone());
                changed = true;
            }
        }
    }
    ids
}

// ---------------------------------------------------------------------------
// Status edits
// ---------------------------------------------------------------------------

/// Set an item's status.
///
/// Entering `work_in_progress` keeps an existing substatus or starts with the
/// empty one; any other status clears the substatus.
pub fn set_status(items: &mut [WorkItem], id: &str, status: Status) -> Result<(), ItemError> {
    let item = find_item_mut(items, id).ok_or_else(|| ItemError::NotFound(id.to_string()))?;
    item.status = status;
    if status == Status::WorkInProgress {
        item.substatus.get_or_insert(Substatus::Unset);
    } else {
        item.substatus = None;
    }
    Ok(())
}

/// Set an item's substatus. `drafted` completes the item immediately.
pub fn set_substatus(items: &mut [WorkItem], id: &str, substatus: Substatus) -> Result<(), ItemError> {
    let item = find_item_mut(items, id).ok_or_else(|| ItemError::NotFound(id.to_string()))?;
    if substatus.is_drafted() {
        item.status = Status::Completed;
        item.substatus = None;
    } else {
        item.substatus = Some(substatus);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// Append a dated note. Whitespace around the text is dropped.
pub fn add_note(items: &mut [WorkItem], id: &str, text: &str, date: NaiveDate) -> Result<(), ItemError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ItemError::EmptyNote);
    }
    let item = find_item_mut(items, id).ok_or_else(|| ItemError::NotFound(id.to_string()))?;
    item.notes.push(Note {
        date,
        text: text.to_string(),
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn find_item<'a>(items: &'a [WorkItem], id: &str) -> Option<&'a WorkItem> {
    items.iter().find(|it| it.id == id)
}

pub fn find_item_mut<'a>(items: &'a mut [WorkItem], id: &str) -> Option<&'a mut WorkItem> {
    items.iter_mut().find(|it| it.id == id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
