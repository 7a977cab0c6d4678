use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::model::item::{Note, Status, Substatus, WorkItem};

/// Error type for project store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("project already exists: {0}")]
    AlreadyExists(String),
    #[error("project not found: {0}")]
    NotFound(String),
    #[error("invalid project name: {0:?}")]
    InvalidName(String),
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("corrupt project file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize project: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Named collections of flat work item records.
///
/// Saves are full snapshots: the last write wins.
pub trait ProjectStore {
    /// Project names in sorted order
    fn list_projects(&self) -> Result<Vec<String>, StoreError>;
    /// Items of a project; a project that was never saved loads as empty
    fn load_project(&self, name: &str) -> Result<Vec<WorkItem>, StoreError>;
    fn save_project(&mut self, name: &str, items: &[WorkItem]) -> Result<(), StoreError>;
    fn exists(&self, name: &str) -> Result<bool, StoreError>;
    fn delete_project(&mut self, name: &str) -> Result<(), StoreError>;

    /// Create an empty project. Fails if the name is taken.
    fn create_project(&mut self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        if self.exists(name)? {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        self.save_project(name, &[])
    }
}

/// Project names become file names, so they may not be empty, start with a
/// dot, or contain path separators / control characters.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let bad = name.trim().is_empty()
        || name.starts_with('.')
        || name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// One `<name>.json` file (a JSON array of work items) per project.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    /// Open a store, creating its directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = FileStore::new(dir);
        fs::create_dir_all(&store.dir).map_err(|e| StoreError::WriteError {
            path: store.dir.clone(),
            source: e,
        })?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{}.json", name)))
    }
}

impl ProjectStore for FileStore {
    fn list_projects(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::ReadError {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StoreError::ReadError {
                    path: self.dir.clone(),
                    source: e,
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && validate_name(stem).is_ok()
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn load_project(&self, name: &str) -> Result<Vec<WorkItem>, StoreError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt { path, source: e })
    }

    fn save_project(&mut self, name: &str, items: &[WorkItem]) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        let content = serde_json::to_string(items)?;
        fs::create_dir_all(&self.dir)
            .and_then(|_| atomic_write(&path, content.as_bytes()))
            .map_err(|e| StoreError::WriteError {
                path: path.clone(),
                source: e,
            })?;
        tracing::debug!(project = name, items = items.len(), path = %path.display(), "saved project");
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(name)?.exists())
    }

    fn delete_project(&mut self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        fs::remove_file(&path).map_err(|e| StoreError::WriteError {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(project = name, "deleted project");
        Ok(())
    }
}

/// Write via a temp file in the same directory, then rename over the target.
///
/// The target keeps its current permissions; a new file gets 0644 instead of
/// the temp file's private mode.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    share_permissions(tmp.as_file(), path)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn share_permissions(tmp: &fs::File, target: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perm = match fs::metadata(target) {
            Ok(meta) => meta.permissions(),
            Err(_) => fs::Permissions::from_mode(0o644),
        };
        tmp.set_permissions(perm)?;
    }
    #[cfg(not(unix))]
    let _ = (tmp, target);
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, for tests and for callers that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    projects: BTreeMap<String, Vec<WorkItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryStore {
    fn list_projects(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.projects.keys().cloned().collect())
    }

    fn load_project(&self, name: &str) -> Result<Vec<WorkItem>, StoreError> {
        Ok(self.projects.get(name).cloned().unwrap_or_default())
    }

    fn save_project(&mut self, name: &str, items: &[WorkItem]) -> Result<(), StoreError> {
        validate_name(name)?;
        self.projects.insert(name.to_string(), items.to_vec());
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.projects.contains_key(name))
    }

    fn delete_project(&mut self, name: &str) -> Result<(), StoreError> {
        self.projects
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Sample data
// ---------------------------------------------------------------------------

/// The two demo projects a fresh install starts with.
pub fn sample_projects() -> Vec<(String, Vec<WorkItem>)> {
    fn note(y: i32, m: u32, d: u32, text: &str) -> Option<Note> {
        Some(Note {
            date: chrono::NaiveDate::from_ymd_opt(y, m, d)?,
            text: text.to_string(),
        })
    }
    fn item(
        id: &str,
        description: &str,
        parent: Option<&str>,
        status: Status,
        substatus: Option<Substatus>,
        notes: Vec<Option<Note>>,
    ) -> WorkItem {
        WorkItem {
            id: id.to_string(),
            description: description.to_string(),
            parent_id: parent.map(String::from),
            status,
            substatus,
            notes: notes.into_iter().flatten().collect(),
        }
    }

    vec![
        (
            "4735".to_string(),
            vec![
                item(
                    "A123",
                    "Boom Assembly",
                    None,
                    Status::WorkInProgress,
                    Some(Substatus::Modeled),
                    vec![note(2025, 9, 9, "Initial modeling started")],
                ),
                item("A123-1", "Arm", Some("A123"), Status::NotStarted, None, vec![]),
                item(
                    "A123-2",
                    "Hydraulic Cylinder",
                    Some("A123"),
                    Status::Completed,
                    None,
                    vec![note(2025, 9, 11, "Purchased")],
                ),
            ],
        ),
        (
            "celery_harvester".to_string(),
            vec![
                item("C1", "Main Frame", None, Status::NotStarted, None, vec![]),
                item("C1-1", "Left Wheel", Some("C1"), Status::NotStarted, None, vec![]),
                item(
                    "C1-2",
                    "Right Wheel",
                    Some("C1"),
                    Status::WorkInProgress,
                    Some(Substatus::Quoted),
                    vec![],
                ),
            ],
        ),
    ]
}

/// Save each sample project that isn't in the store yet. Returns the names seeded.
pub fn seed_samples(store: &mut dyn ProjectStore) -> Result<Vec<String>, StoreError> {
    let mut seeded = Vec::new();
    for (name, items) in sample_projects() {
        if store.exists(&name)? {
            continue;
        }
        store.save_project(&name, &items)?;
        tracing::info!(project = %name, "seeded sample project");
        seeded.push(name);
    }
    Ok(seeded)
}
