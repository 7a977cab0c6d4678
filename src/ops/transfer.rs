use serde::Deserialize;
use serde_json::Value;

use crate::model::item::WorkItem;
use crate::model::project::Project;

/// Error type for project import/export
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("bad JSON: {0}")]
    BadJson(serde_json::Error),
    #[error("bad file: missing project name")]
    MissingName,
    #[error("bad file: \"items\" must be an array")]
    ItemsNotArray,
    #[error("bad file: item {index} is malformed: {source}")]
    BadItem {
        index: usize,
        source: serde_json::Error,
    },
    #[error("could not serialize project: {0}")]
    Serialize(serde_json::Error),
}

/// Serialize a project as pretty-printed `{ "name", "items" }` JSON.
pub fn export_json(name: &str, items: &[WorkItem]) -> Result<String, TransferError> {
    #[derive(serde::Serialize)]
    struct ExportRef<'a> {
        name: &'a str,
        items: &'a [WorkItem],
    }
    serde_json::to_string_pretty(&ExportRef { name, items }).map_err(TransferError::Serialize)
}

/// File name an export is saved under
pub fn export_file_name(name: &str) -> String {
    format!("{}.json", name)
}

/// Parse an import file.
///
/// The document must be an object with a non-empty string `name` and an
/// array `items` whose entries are all valid work items.
pub fn parse_import(text: &str) -> Result<Project, TransferError> {
    let doc: Value = serde_json::from_str(text).map_err(TransferError::BadJson)?;

    let name = match doc.get("name") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => return Err(TransferError::MissingName),
    };
    let raw_items = match doc.get("items") {
        Some(Value::Array(items)) => items,
        _ => return Err(TransferError::ItemsNotArray),
    };

    let items = raw_items
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            WorkItem::deserialize(raw).map_err(|source| TransferError::BadItem { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Project { name, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::sample_projects;
    use pretty_assertions::assert_eq;

    #[test]
    fn export_shape() {
        let items = vec![WorkItem::new("C1", "Main Frame", None)];
        let text = export_json("celery_harvester", &items).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["name"], "celery_harvester");
        assert_eq!(value["items"][0]["id"], "C1");
        assert_eq!(value["items"][0]["parent_id"], Value::Null);
        assert_eq!(export_file_name("celery_harvester"), "celery_harvester.json");
    }

    #[test]
    fn export_then_import_round_trips() {
        for (name, items) in sample_projects() {
            let text = export_json(&name, &items).unwrap();
            let project = parse_import(&text).unwrap();
            assert_eq!(project.name, name);
            assert_eq!(project.items, items);
        }
    }

    #[test]
    fn rejects_unparsable_json() {
        assert!(matches!(parse_import("{oops"), Err(TransferError::BadJson(_))));
    }

    #[test]
    fn rejects_missing_or_empty_name() {
        assert!(matches!(
            parse_import(r#"{"items": []}"#),
            Err(TransferError::MissingName)
        ));
        assert!(matches!(
            parse_import(r#"{"name": "", "items": []}"#),
            Err(TransferError::MissingName)
        ));
        assert!(matches!(
            parse_import(r#"{"name": 12, "items": []}"#),
            Err(TransferError::MissingName)
        ));
    }

    #[test]
    fn rejects_non_array_items() {
        assert!(matches!(
            parse_import(r#"{"name": "x", "items": {}}"#),
            Err(TransferError::ItemsNotArray)
        ));
        assert!(matches!(
            parse_import(r#"{"name": "x"}"#),
            Err(TransferError::ItemsNotArray)
        ));
        assert!(matches!(parse_import("[]"), Err(TransferError::MissingName)));
    }

    #[test]
    fn rejects_malformed_item() {
        let err = parse_import(
            r#"{"name": "x", "items": [
                {"id": "A", "description": "a", "status": "completed"},
                {"id": "B", "description": "b", "status": "finished"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::BadItem { index: 1, .. }));
    }

    #[test]
    fn import_keeps_orphans() {
        let project = parse_import(
            r#"{"name": "x", "items": [
                {"id": "A", "description": "a", "parent_id": null, "status": "not_started", "substatus": null, "notes": []},
                {"id": "Z-1", "description": "orphan", "parent_id": "Z", "status": "completed", "substatus": null, "notes": []}
            ]}"#,
        )
        .unwrap();
        assert_eq!(project.items.len(), 2);
        assert_eq!(project.items[1].parent_id.as_deref(), Some("Z"));
    }
}
