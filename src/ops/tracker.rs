use std::collections::HashSet;

use crate::io::store::{ProjectStore, StoreError};
use crate::model::item::{Status, Substatus, WorkItem};
use crate::model::project::Project;
use crate::model::tree::TreeNode;
use crate::ops::item_ops::{self, ItemError};
use crate::ops::transfer::{self, TransferError};
use crate::ops::tree::{self, StatusFilter};

/// Error type for tracker commands
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("no project is open")]
    NoProjectOpen,
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Progress tracker controller.
///
/// Owns the application state (open project, its flat item list, the display
/// filter and expanded nodes) plus the store it persists to. Every mutating
/// command validates, applies to the flat list, recomputes the derived state
/// and saves a full snapshot; a rejected command leaves everything unchanged.
pub struct Tracker<S: ProjectStore> {
    store: S,
    current: Option<String>,
    items: Vec<WorkItem>,
    filter: StatusFilter,
    expanded: HashSet<String>,
}

impl<S: ProjectStore> Tracker<S> {
    pub fn new(store: S) -> Self {
        Tracker {
            store,
            current: None,
            items: Vec::new(),
            filter: StatusFilter::All,
            expanded: HashSet::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Name of the open project
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// The flat item list of the open project (the source of truth)
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn list_projects(&self) -> Result<Vec<String>, TrackerError> {
        Ok(self.store.list_projects()?)
    }

    /// Load a project, normalize it and write the normalized snapshot back.
    pub fn open(&mut self, name: &str) -> Result<(), TrackerError> {
        let mut items = self.store.load_project(name)?;
        tree::recompute(&mut items);
        self.store.save_project(name, &items)?;
        self.current = Some(name.to_string());
        self.items = items;
        self.expanded.clear();
        tracing::debug!(project = name, items = self.items.len(), "opened project");
        Ok(())
    }

    /// Create an empty project and open it.
    pub fn create_project(&mut self, name: &str) -> Result<(), TrackerError> {
        self.store.create_project(name)?;
        self.open(name)
    }

    /// Delete a project. Closes it first if it is the open one.
    pub fn delete_project(&mut self, name: &str) -> Result<(), TrackerError> {
        self.store.delete_project(name)?;
        if self.current.as_deref() == Some(name) {
            self.current = None;
            self.items.clear();
            self.expanded.clear();
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tree view
    // -----------------------------------------------------------------------

    /// Recompute and return the root nodes of the open project.
    pub fn tree(&mut self) -> Result<Vec<TreeNode>, TrackerError> {
        self.require_open()?;
        Ok(tree::recompute(&mut self.items))
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    /// Ids shown under the current filter
    pub fn visible_ids(&mut self) -> Result<HashSet<String>, TrackerError> {
        let roots = self.tree()?;
        Ok(tree::visible_ids(&roots, self.filter))
    }

    /// Flip a node between expanded and collapsed. Returns the new state.
    pub fn toggle_expanded(&mut self, id: &str) -> bool {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_string());
            return true;
        }
        false
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    // -----------------------------------------------------------------------
    // Item commands
    // -----------------------------------------------------------------------

    pub fn add_item(&mut self, parent_id: Option<&str>, id: &str, description: &str) -> Result<(), TrackerError> {
        self.apply(|items| item_ops::add_item(items, parent_id, id, description))
    }

    /// Delete an item and its descendants. Returns the removed ids.
    pub fn delete_item(&mut self, id: &str) -> Result<Vec<String>, TrackerError> {
        let removed = self.apply(|items| item_ops::delete_item(items, id))?;
        for gone in &removed {
            self.expanded.remove(gone);
        }
        Ok(removed)
    }

    pub fn set_status(&mut self, id: &str, status: Status) -> Result<(), TrackerError> {
        self.apply(|items| item_ops::set_status(items, id, status))
    }

    pub fn set_substatus(&mut self, id: &str, substatus: Substatus) -> Result<(), TrackerError> {
        self.apply(|items| item_ops::set_substatus(items, id, substatus))
    }

    /// Append a note dated today.
    pub fn add_note(&mut self, id: &str, text: &str) -> Result<(), TrackerError> {
        let today = item_ops::today();
        self.apply(|items| item_ops::add_note(items, id, text, today))
    }

    // -----------------------------------------------------------------------
    // Import / export
    // -----------------------------------------------------------------------

    /// The open project as an export document
    pub fn export(&mut self) -> Result<Project, TrackerError> {
        let name = self.require_open()?.to_string();
        tree::recompute(&mut self.items);
        self.store.save_project(&name, &self.items)?;
        Ok(Project::new(name, self.items.clone()))
    }

    pub fn export_json(&mut self) -> Result<String, TrackerError> {
        let project = self.export()?;
        Ok(transfer::export_json(&project.name, &project.items)?)
    }

    /// Store an imported project under its own name (replacing any project of
    /// that name) and open it. Returns the project name.
    pub fn import(&mut self, text: &str) -> Result<String, TrackerError> {
        let mut project = transfer::parse_import(text)?;
        // Normalize before anything reaches the store
        tree::recompute(&mut project.items);
        self.store.save_project(&project.name, &project.items)?;
        self.open(&project.name)?;
        tracing::info!(project = %project.name, items = project.items.len(), "imported project");
        Ok(project.name)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn require_open(&self) -> Result<&str, TrackerError> {
        self.current.as_deref().ok_or(TrackerError::NoProjectOpen)
    }

    /// Run a mutation on a scratch copy; on success recompute, persist and
    /// swap it in.
    fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut Vec<WorkItem>) -> Result<T, ItemError>,
    ) -> Result<T, TrackerError> {
        let name = self.require_open()?.to_string();
        let mut next = self.items.clone();
        let out = op(&mut next).inspect_err(|e| {
            tracing::debug!(project = %name, error = %e, "rejected item command");
        })?;
        tree::recompute(&mut next);
        self.store.save_project(&name, &next)?;
        self.items = next;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::{MemoryStore, seed_samples};
    use crate::ops::tree::find_node;
    use pretty_assertions::assert_eq;

    fn tracker() -> Tracker<MemoryStore> {
        let mut store = MemoryStore::new();
        seed_samples(&mut store).unwrap();
        let mut tracker = Tracker::new(store);
        tracker.open("4735").unwrap();
        tracker
    }

    #[test]
    fn open_normalizes_and_persists() {
        let t = tracker();
        // A123 has children, so its stored "modeled" substatus is overwritten
        let a123 = &t.items()[0];
        assert_eq!(a123.status, Status::WorkInProgress);
        assert_eq!(a123.substatus, None);
        assert_eq!(t.store().load_project("4735").unwrap(), t.items());
    }

    #[test]
    fn sample_tree_progress() {
        let mut t = tracker();
        let roots = t.tree().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].progress, 0.5);
        assert_eq!(roots[0].percent(), 50);
    }

    #[test]
    fn commands_require_open_project() {
        let mut t = Tracker::new(MemoryStore::new());
        assert!(matches!(t.tree(), Err(TrackerError::NoProjectOpen)));
        assert!(matches!(
            t.add_item(None, "A", "a"),
            Err(TrackerError::NoProjectOpen)
        ));
    }

    #[test]
    fn add_persists_and_recomputes() {
        let mut t = tracker();
        t.add_item(Some("A123-1"), "A123-1-1", "Arm Weldment").unwrap();
        t.set_status("A123-1-1", Status::Completed).unwrap();
        let saved = t.store().load_project("4735").unwrap();
        assert_eq!(saved.len(), 4);
        // A123-1 now derives from its only child
        let arm = saved.iter().find(|it| it.id == "A123-1").unwrap();
        assert_eq!(arm.status, Status::Completed);
        let roots = t.tree().unwrap();
        assert_eq!(roots[0].status(), Status::Completed);
        assert_eq!(roots[0].progress, 1.0);
    }

    #[test]
    fn rejected_command_changes_nothing() {
        let mut t = tracker();
        let before_items = t.items().to_vec();
        let before_saved = t.store().load_project("4735").unwrap();
        let err = t.add_item(None, "A123-2", "dup").unwrap_err();
        assert!(matches!(err, TrackerError::Item(ItemError::DuplicateId(_))));
        assert!(t.add_note("A123", "   ").is_err());
        assert!(t.set_status("missing", Status::Completed).is_err());
        assert_eq!(t.items(), before_items.as_slice());
        assert_eq!(t.store().load_project("4735").unwrap(), before_saved);
    }

    #[test]
    fn drafted_substatus_completes_leaf() {
        let mut t = tracker();
        t.set_status("A123-1", Status::WorkInProgress).unwrap();
        t.set_substatus("A123-1", Substatus::Drafted).unwrap();
        let roots = t.tree().unwrap();
        let arm = find_node(&roots, "A123-1").unwrap();
        assert_eq!(arm.status(), Status::Completed);
        assert_eq!(arm.progress, 1.0);
        assert_eq!(roots[0].status(), Status::Completed);
    }

    #[test]
    fn delete_cascades_and_forgets_expansion() {
        let mut t = tracker();
        t.add_item(Some("A123-1"), "A123-1-1", "Pin").unwrap();
        assert!(t.toggle_expanded("A123-1"));
        let removed = t.delete_item("A123-1").unwrap();
        assert_eq!(removed, vec!["A123-1".to_string(), "A123-1-1".to_string()]);
        assert!(!t.is_expanded("A123-1"));
        assert_eq!(t.items().len(), 2);
    }

    #[test]
    fn note_is_dated_today() {
        let mut t = tracker();
        t.add_note("A123-2", "Received, inspected").unwrap();
        let notes = &t.items()[2].notes;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].text, "Received, inspected");
        assert_eq!(notes[1].date, item_ops::today());
    }

    #[test]
    fn filter_state_drives_visibility() {
        let mut t = tracker();
        t.set_filter(StatusFilter::Only(Status::Completed));
        let shown = t.visible_ids().unwrap();
        assert!(shown.contains("A123"));
        assert!(shown.contains("A123-2"));
        assert!(!shown.contains("A123-1"));
    }

    #[test]
    fn toggle_expanded_flips() {
        let mut t = tracker();
        assert!(t.toggle_expanded("A123"));
        assert!(t.is_expanded("A123"));
        assert!(!t.toggle_expanded("A123"));
        assert!(!t.is_expanded("A123"));
    }

    #[test]
    fn create_and_delete_projects() {
        let mut t = tracker();
        t.create_project("skid-7").unwrap();
        assert_eq!(t.current(), Some("skid-7"));
        assert!(t.items().is_empty());
        assert!(matches!(
            t.create_project("4735"),
            Err(TrackerError::Store(StoreError::AlreadyExists(_)))
        ));
        t.delete_project("skid-7").unwrap();
        assert_eq!(t.current(), None);
        assert_eq!(t.list_projects().unwrap(), vec!["4735", "celery_harvester"]);
    }

    #[test]
    fn export_import_round_trip_with_orphan() {
        let mut t = tracker();
        let mut orphan = WorkItem::new("Z-1", "Loose bracket", Some("Z".into()));
        orphan.status = Status::Completed;
        let mut items = t.items().to_vec();
        items.push(orphan);
        let text = transfer::export_json("bracketry", &items).unwrap();

        let name = t.import(&text).unwrap();
        assert_eq!(name, "bracketry");
        assert_eq!(t.current(), Some("bracketry"));
        let roots = t.tree().unwrap();
        assert!(find_node(&roots, "Z-1").is_none());

        let exported = t.export().unwrap();
        assert_eq!(exported.items, items);
    }

    #[test]
    fn bad_import_changes_nothing() {
        let mut t = tracker();
        let before = t.list_projects().unwrap();
        assert!(matches!(
            t.import(r#"{"items": []}"#),
            Err(TrackerError::Transfer(TransferError::MissingName))
        ));
        assert_eq!(t.list_projects().unwrap(), before);
        assert_eq!(t.current(), Some("4735"));
    }

    #[test]
    fn import_stores_normalized_items() {
        let mut t = tracker();
        let items = vec![
            WorkItem::new("P", "Power unit", None),
            {
                let mut it = WorkItem::new("P-1", "Reservoir", Some("P".into()));
                it.status = Status::WorkInProgress;
                it.substatus = Some(Substatus::Drafted);
                it
            },
        ];
        let text = transfer::export_json("hpu", &items).unwrap();
        t.import(&text).unwrap();

        let stored = t.store().load_project("hpu").unwrap();
        assert_eq!(stored[0].status, Status::Completed);
        assert_eq!(stored[1].status, Status::Completed);
        assert_eq!(stored[1].substatus, None);
    }

    #[test]
    fn import_deep_chain() {
        let depth: usize = 5000;
        let items: Vec<WorkItem> = (0..depth)
            .map(|i| WorkItem::new(format!("N{}", i), "link", i.checked_sub(1).map(|p| format!("N{}", p))))
            .collect();
        let text = transfer::export_json("deep", &items).unwrap();

        let mut t = tracker();
        assert_eq!(t.import(&text).unwrap(), "deep");
        let roots = t.tree().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(tree::flatten(&roots).len(), depth);
        assert_eq!(t.store().load_project("deep").unwrap().len(), depth);
    }
}
