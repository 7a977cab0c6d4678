use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::model::item::{Status, Substatus, WorkItem};
use crate::model::tree::TreeNode;

// Parent chains have no depth limit, so every walk below keeps its own
// worklist instead of recursing.

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

/// Build the parent/child view of a flat item list.
///
/// Children keep the order in which they appear in `items`. An item with no
/// parent or an empty `parent_id` is a root. Items whose `parent_id` names no
/// item are orphans: they stay in the flat list but are left out of the tree.
pub fn build_tree(items: &[WorkItem]) -> Vec<TreeNode> {
    // id -> position in `items`; the first record of a duplicated id wins
    let mut index: IndexMap<&str, usize> = IndexMap::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        index.entry(item.id.as_str()).or_insert(pos);
    }

    // Resolve each item's parent to its position in `items`
    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    let mut roots = Vec::new();
    for (pos, item) in items.iter().enumerate() {
        if index.get(item.id.as_str()) != Some(&pos) {
            continue;
        }
        match item.parent_id.as_deref().filter(|parent| !parent.is_empty()) {
            None => roots.push(pos),
            Some(parent) => match index.get(parent) {
                Some(&parent_pos) if parent_pos != pos => children_of[parent_pos].push(pos),
                _ => {
                    tracing::debug!(id = %item.id, parent = parent, "orphaned work item left out of tree");
                }
            },
        }
    }

    // Every item has at most one parent, so items on a parent cycle are never
    // reachable from a root. Children follow their parent in pre-order, so
    // building in reverse finishes each child before its parent takes it.
    let mut built: Vec<Option<TreeNode>> = vec![None; items.len()];
    for pos in preorder(&roots, &children_of).into_iter().rev() {
        let mut node = TreeNode::new(items[pos].clone(), pos);
        node.children = children_of[pos]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[pos] = Some(node);
    }
    roots.into_iter().filter_map(|pos| built[pos].take()).collect()
}

/// Positions reachable from `roots`, each parent before its children
fn preorder(roots: &[usize], children_of: &[Vec<usize>]) -> Vec<usize> {
    let mut order = Vec::new();
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(pos) = stack.pop() {
        order.push(pos);
        stack.extend(children_of[pos].iter().rev());
    }
    order
}

// ---------------------------------------------------------------------------
// Progress aggregation
// ---------------------------------------------------------------------------

/// Derived progress and status of one node
struct Rollup {
    progress: f64,
    status: Status,
    substatus: Option<Substatus>,
}

/// Compute progress for `node` and its subtree, bottom-up.
///
/// Leaves get their progress from status/substatus (a `drafted` leaf is
/// completed on the spot). Internal nodes take the plain mean of their
/// children's progress and a status derived from the children; their
/// substatus is cleared. Every derived status/substatus is written back to
/// `items[node.pos]`, so `items` must be the list the tree was built from.
pub fn aggregate(node: &mut TreeNode, items: &mut [WorkItem]) -> f64 {
    aggregate_all(std::slice::from_mut(node), items);
    node.progress
}

fn aggregate_all(roots: &mut [TreeNode], items: &mut [WorkItem]) {
    // Reverse pre-order settles every child before its parent
    let mut rollups: HashMap<usize, Rollup> = HashMap::new();
    for (_, node) in flatten(roots).into_iter().rev() {
        let rollup = if node.is_leaf() {
            leaf_rollup(node.status(), node.substatus())
        } else {
            internal_rollup(
                node.children
                    .iter()
                    .filter_map(|child| rollups.get(&child.pos)),
            )
        };
        if let Some(item) = items.get_mut(node.pos) {
            item.status = rollup.status;
            item.substatus = rollup.substatus.clone();
        }
        rollups.insert(node.pos, rollup);
    }

    let mut stack: Vec<&mut TreeNode> = roots.iter_mut().collect();
    while let Some(node) = stack.pop() {
        if let Some(rollup) = rollups.remove(&node.pos) {
            node.progress = rollup.progress;
            node.item.status = rollup.status;
            node.item.substatus = rollup.substatus;
        }
        stack.extend(node.children.iter_mut());
    }
}

fn leaf_rollup(status: Status, substatus: Option<&Substatus>) -> Rollup {
    match status {
        Status::WorkInProgress => {
            let sub = substatus.cloned().unwrap_or(Substatus::Unset);
            if sub.is_drafted() {
                Rollup {
                    progress: 1.0,
                    status: Status::Completed,
                    substatus: None,
                }
            } else {
                Rollup {
                    progress: sub.weight().unwrap_or(Status::WorkInProgress.weight()),
                    status,
                    substatus: Some(sub),
                }
            }
        }
        status => Rollup {
            progress: status.weight(),
            status,
            substatus: substatus.cloned(),
        },
    }
}

fn internal_rollup<'a>(children: impl Iterator<Item = &'a Rollup>) -> Rollup {
    let mut count = 0;
    let mut sum = 0.0;
    let mut all_completed = true;
    let mut all_not_started = true;
    for child in children {
        count += 1;
        sum += child.progress;
        all_completed &= child.status == Status::Completed;
        all_not_started &= child.status == Status::NotStarted;
    }
    let status = if all_completed {
        Status::Completed
    } else if all_not_started {
        Status::NotStarted
    } else {
        Status::WorkInProgress
    };
    Rollup {
        progress: if count == 0 { 0.0 } else { sum / count as f64 },
        status,
        substatus: None,
    }
}

/// Rebuild the tree from `items` and aggregate every root.
///
/// This is the only way callers should obtain a tree: it normalizes the
/// stored status/substatus fields as a side effect.
pub fn recompute(items: &mut [WorkItem]) -> Vec<TreeNode> {
    let mut roots = build_tree(items);
    aggregate_all(&mut roots, items);
    roots
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Status filter applied to the tree for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<StatusFilter> {
        if s == "all" {
            return Some(StatusFilter::All);
        }
        Status::parse(s).map(StatusFilter::Only)
    }

    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => s == status,
        }
    }
}

/// Ids of the nodes shown under `filter`.
///
/// A node is shown when it matches the filter itself or when any node below
/// it is shown. A hidden node's whole subtree is hidden.
pub fn visible_ids(roots: &[TreeNode], filter: StatusFilter) -> HashSet<String> {
    let mut shown = HashSet::new();
    // Children come first; every one is evaluated, since siblings of a shown
    // node may be shown too
    for (_, node) in flatten(roots).into_iter().rev() {
        if filter.matches(node.status()) || node.children.iter().any(|c| shown.contains(c.id())) {
            shown.insert(node.item.id.clone());
        }
    }
    shown
}

// ---------------------------------------------------------------------------
// Navigation helpers
// ---------------------------------------------------------------------------

/// Find a node by id anywhere in the tree, searching depth-first.
pub fn find_node<'a>(roots: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
    let mut stack: Vec<&TreeNode> = roots.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if node.id() == id {
            return Some(node);
        }
        stack.extend(node.children.iter().rev());
    }
    None
}

/// Depth-first (pre-order) walk of the tree, yielding `(depth, node)`.
pub fn flatten(roots: &[TreeNode]) -> Vec<(usize, &TreeNode)> {
    let mut out = Vec::new();
    let mut stack: Vec<(usize, &TreeNode)> = roots.iter().rev().map(|n| (0, n)).collect();
    while let Some((depth, node)) = stack.pop() {
        out.push((depth, node));
        stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(id: &str, parent: Option<&str>, status: Status, sub: Option<&str>) -> WorkItem {
        let mut it = WorkItem::new(id, format!("{} desc", id), parent.map(String::from));
        it.status = status;
        it.substatus = sub.map(Substatus::from);
        it
    }

    fn parent_with(children: &[Status]) -> Vec<WorkItem> {
        let mut items = vec![item("P", None, Status::NotStarted, None)];
        for (i, s) in children.iter().enumerate() {
            items.push(item(&format!("P-{}", i + 1), Some("P"), *s, None));
        }
        items
    }

    // --- Construction ---

    #[test]
    fn build_tree_links_in_encounter_order() {
        let items = vec![
            item("A", None, Status::NotStarted, None),
            item("A-2", Some("A"), Status::NotStarted, None),
            item("B", None, Status::NotStarted, None),
            item("A-1", Some("A"), Status::NotStarted, None),
            item("A-1-1", Some("A-1"), Status::NotStarted, None),
        ];
        let roots = build_tree(&items);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].id(), "A");
        assert_eq!(roots[1].id(), "B");
        let kids: Vec<&str> = roots[0].children.iter().map(|c| c.id()).collect();
        assert_eq!(kids, vec!["A-2", "A-1"]);
        assert_eq!(roots[0].children[1].children[0].id(), "A-1-1");
    }

    #[test]
    fn orphans_are_left_out_of_tree_but_kept_in_list() {
        let mut items = vec![
            item("A", None, Status::NotStarted, None),
            item("X-1", Some("X"), Status::Completed, None),
        ];
        let roots = recompute(&mut items);
        assert_eq!(roots.len(), 1);
        assert!(find_node(&roots, "X-1").is_none());
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, "X-1");
    }

    #[test]
    fn empty_parent_id_is_a_root() {
        let items = vec![
            item("A", Some(""), Status::NotStarted, None),
            item("A-1", Some("A"), Status::NotStarted, None),
        ];
        let roots = build_tree(&items);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id(), "A");
        assert_eq!(roots[0].children[0].id(), "A-1");
    }

    #[test]
    fn parent_cycle_is_not_reachable() {
        let items = vec![
            item("A", Some("B"), Status::NotStarted, None),
            item("B", Some("A"), Status::NotStarted, None),
            item("C", None, Status::NotStarted, None),
        ];
        let roots = build_tree(&items);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id(), "C");
    }

    // --- Aggregation ---

    #[test]
    fn all_completed_children() {
        let mut items = parent_with(&[Status::Completed, Status::Completed]);
        let roots = recompute(&mut items);
        assert_eq!(roots[0].status(), Status::Completed);
        assert_eq!(roots[0].progress, 1.0);
        assert_eq!(items[0].status, Status::Completed);
    }

    #[test]
    fn all_not_started_children() {
        let mut items = parent_with(&[Status::NotStarted, Status::NotStarted]);
        items[0].status = Status::Completed; // stale; must be overwritten
        let roots = recompute(&mut items);
        assert_eq!(roots[0].status(), Status::NotStarted);
        assert_eq!(roots[0].progress, 0.0);
        assert_eq!(items[0].status, Status::NotStarted);
    }

    #[test]
    fn mixed_children_are_work_in_progress() {
        let mut items = parent_with(&[Status::Completed, Status::NotStarted]);
        let roots = recompute(&mut items);
        assert_eq!(roots[0].status(), Status::WorkInProgress);
        assert_eq!(roots[0].progress, 0.5);
        assert_eq!(items[0].substatus, None);
    }

    #[test]
    fn substatus_weights_on_leaves() {
        let mut items = vec![
            item("M", None, Status::WorkInProgress, Some("modeled")),
            item("Q", None, Status::WorkInProgress, Some("quoted")),
            item("E", None, Status::WorkInProgress, Some("")),
            item("N", None, Status::WorkInProgress, None),
            item("U", None, Status::WorkInProgress, Some("welded")),
        ];
        let roots = recompute(&mut items);
        let progress: Vec<f64> = roots.iter().map(|r| r.progress).collect();
        assert_eq!(progress, vec![0.33, 0.66, 0.5, 0.5, 0.5]);
        // A missing substatus on a WIP leaf is normalized to the empty string
        assert_eq!(items[3].substatus, Some(Substatus::Unset));
        assert_eq!(items[4].substatus, Some(Substatus::Other("welded".into())));
    }

    #[test]
    fn drafted_leaf_completes_on_recompute() {
        let mut items = vec![item("D", None, Status::WorkInProgress, Some("drafted"))];
        let roots = recompute(&mut items);
        assert_eq!(roots[0].status(), Status::Completed);
        assert_eq!(roots[0].substatus(), None);
        assert_eq!(roots[0].progress, 1.0);
        assert_eq!(items[0].status, Status::Completed);
        assert_eq!(items[0].substatus, None);
    }

    #[test]
    fn internal_substatus_is_cleared() {
        let mut items = vec![
            item("P", None, Status::WorkInProgress, Some("quoted")),
            item("P-1", Some("P"), Status::WorkInProgress, Some("modeled")),
        ];
        let roots = recompute(&mut items);
        // One child: progress copied verbatim
        assert_eq!(roots[0].progress, 0.33);
        assert_eq!(items[0].substatus, None);
        assert_eq!(items[1].substatus, Some(Substatus::Modeled));
    }

    #[test]
    fn mean_is_not_weighted_by_subtree_size() {
        let mut items = vec![
            item("R", None, Status::NotStarted, None),
            item("R-1", Some("R"), Status::Completed, None),
            item("R-2", Some("R"), Status::NotStarted, None),
            item("R-2-1", Some("R-2"), Status::NotStarted, None),
            item("R-2-2", Some("R-2"), Status::NotStarted, None),
            item("R-2-3", Some("R-2"), Status::WorkInProgress, Some("quoted")),
        ];
        let roots = recompute(&mut items);
        let r2 = find_node(&roots, "R-2").unwrap();
        assert!((r2.progress - 0.22).abs() < 1e-9);
        assert_eq!(r2.status(), Status::WorkInProgress);
        assert!((roots[0].progress - 0.61).abs() < 1e-9);
    }

    #[test]
    fn duplicate_ids_write_back_to_first_record_only() {
        let mut items = vec![
            item("A", None, Status::NotStarted, None),
            item("A-1", Some("A"), Status::Completed, None),
            item("A", None, Status::WorkInProgress, Some("quoted")),
        ];
        let roots = recompute(&mut items);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].pos, 0);
        assert_eq!(roots[0].children[0].pos, 1);
        assert_eq!(items[0].status, Status::Completed);
        assert_eq!(items[2].status, Status::WorkInProgress);
        assert_eq!(items[2].substatus, Some(Substatus::Quoted));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let mut items = vec![
            item("A", None, Status::NotStarted, None),
            item("A-1", Some("A"), Status::WorkInProgress, None),
            item("A-2", Some("A"), Status::WorkInProgress, Some("drafted")),
            item("A-3", Some("A"), Status::WorkInProgress, Some("quoted")),
            item("B", None, Status::Completed, None),
        ];
        let first_tree = recompute(&mut items);
        let first_items = items.clone();
        let second_tree = recompute(&mut items);
        assert_eq!(first_tree, second_tree);
        assert_eq!(first_items, items);
    }

    // --- Filtering ---

    #[test]
    fn filter_all_shows_everything() {
        let mut items = parent_with(&[Status::Completed, Status::NotStarted]);
        let roots = recompute(&mut items);
        assert_eq!(visible_ids(&roots, StatusFilter::All).len(), 3);
    }

    #[test]
    fn filter_propagates_to_ancestors() {
        let mut items = vec![
            item("R", None, Status::NotStarted, None),
            item("R-1", Some("R"), Status::NotStarted, None),
            item("R-1-1", Some("R-1"), Status::Completed, None),
            item("R-1-2", Some("R-1"), Status::NotStarted, None),
            item("S", None, Status::NotStarted, None),
            item("S-1", Some("S"), Status::NotStarted, None),
        ];
        let roots = recompute(&mut items);
        let shown = visible_ids(&roots, StatusFilter::Only(Status::Completed));
        assert!(shown.contains("R"));
        assert!(shown.contains("R-1"));
        assert!(shown.contains("R-1-1"));
        assert!(!shown.contains("R-1-2"));
        assert!(!shown.contains("S"));
        assert!(!shown.contains("S-1"));
    }

    #[test]
    fn filter_parse() {
        assert_eq!(StatusFilter::parse("all"), Some(StatusFilter::All));
        assert_eq!(
            StatusFilter::parse("completed"),
            Some(StatusFilter::Only(Status::Completed))
        );
        assert_eq!(StatusFilter::parse("nope"), None);
    }

    #[test]
    fn flatten_is_preorder_with_depth() {
        let items = vec![
            item("A", None, Status::NotStarted, None),
            item("A-1", Some("A"), Status::NotStarted, None),
            item("A-1-1", Some("A-1"), Status::NotStarted, None),
            item("B", None, Status::NotStarted, None),
        ];
        let roots = build_tree(&items);
        let flat: Vec<(usize, &str)> = flatten(&roots).into_iter().map(|(d, n)| (d, n.id())).collect();
        assert_eq!(flat, vec![(0, "A"), (1, "A-1"), (2, "A-1-1"), (0, "B")]);
    }

    // --- Depth ---

    /// `N0 <- N1 <- ... <- N{depth-1}`, only the bottom link completed
    fn chain(depth: usize) -> Vec<WorkItem> {
        (0..depth)
            .map(|i| {
                let parent = i.checked_sub(1).map(|p| format!("N{}", p));
                let status = if i + 1 == depth {
                    Status::Completed
                } else {
                    Status::NotStarted
                };
                item(&format!("N{}", i), parent.as_deref(), status, None)
            })
            .collect()
    }

    #[test]
    fn deep_chain_is_walked_without_recursion() {
        let depth = 5000;
        let mut items = chain(depth);
        let roots = recompute(&mut items);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].progress, 1.0);
        assert!(items.iter().all(|it| it.status == Status::Completed));

        let flat = flatten(&roots);
        assert_eq!(flat.len(), depth);
        assert_eq!((flat[depth - 1].0, flat[depth - 1].1.id()), (depth - 1, "N4999"));

        let shown = visible_ids(&roots, StatusFilter::Only(Status::Completed));
        assert_eq!(shown.len(), depth);
        assert_eq!(find_node(&roots, "N4999").map(|n| n.pos), Some(depth - 1));
        drop(roots);
    }
}
