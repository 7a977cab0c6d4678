use super::item::{Status, Substatus, WorkItem};

/// A work item placed in the derived tree view, with its computed progress.
///
/// Built from the flat item list on demand and thrown away afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub item: WorkItem,
    /// Position of `item` in the flat list the tree was built from
    pub pos: usize,
    /// Fractional completion in `[0, 1]`
    pub progress: f64,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(item: WorkItem, pos: usize) -> Self {
        TreeNode {
            item,
            pos,
            progress: 0.0,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.item.id
    }

    pub fn status(&self) -> Status {
        self.item.status
    }

    pub fn substatus(&self) -> Option<&Substatus> {
        self.item.substatus.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Progress as a whole percentage, rounded half away from zero
    pub fn percent(&self) -> u32 {
        (self.progress * 100.0).round() as u32
    }
}

// Parent chains have no depth limit, so subtrees are torn down from a
// worklist instead of one stack frame per level.
impl Drop for TreeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}
