use std::collections::HashSet;

use serde::Serialize;

use crate::model::item::{Note, Status, Substatus, WorkItem};
use crate::model::tree::TreeNode;
use crate::ops::bom::BomDiff;
use crate::ops::lookup::{FuzzyHit, Part};
use crate::ops::tree::flatten;
use crate::util::unicode::{display_width, pad_to_width, truncate_to_width};

/// Widest description shown in tables before truncation
const MAX_DESC_WIDTH: usize = 48;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TreeNodeJson {
    pub id: String,
    pub description: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substatus: Option<Substatus>,
    pub progress: f64,
    pub percent: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNodeJson>,
}

impl Drop for TreeNodeJson {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

#[derive(Serialize)]
pub struct ItemJson {
    pub id: String,
    pub description: String,
    pub parent_id: Option<String>,
    pub status: Status,
    pub substatus: Option<Substatus>,
    pub notes: usize,
}

#[derive(Serialize)]
pub struct CalcJson {
    pub value: f64,
    pub unit: String,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Convert a node and its visible descendants. `None` shows everything.
pub fn tree_to_json(node: &TreeNode, visible: Option<&HashSet<String>>) -> TreeNodeJson {
    let shown = |n: &TreeNode| visible.is_none_or(|v| v.contains(n.id()));

    // Pre-order over the shown descendants; a hidden node prunes its subtree
    let mut order: Vec<(usize, &TreeNode)> = Vec::new();
    let mut stack: Vec<(usize, &TreeNode)> = node
        .children
        .iter()
        .rev()
        .filter(|c| shown(*c))
        .map(|c| (1, c))
        .collect();
    while let Some((depth, n)) = stack.pop() {
        order.push((depth, n));
        stack.extend(
            n.children
                .iter()
                .rev()
                .filter(|c| shown(*c))
                .map(|c| (depth + 1, c)),
        );
    }

    // Walking it backwards, a node's finished children sit on top of `done`
    let mut done: Vec<(usize, TreeNodeJson)> = Vec::new();
    for (depth, n) in order.into_iter().rev() {
        let first = done
            .iter()
            .rposition(|(d, _)| *d <= depth)
            .map_or(0, |i| i + 1);
        let mut json = node_json(n);
        json.children = done.drain(first..).rev().map(|(_, c)| c).collect();
        done.push((depth, json));
    }

    let mut root = node_json(node);
    root.children = done.into_iter().rev().map(|(_, c)| c).collect();
    root
}

fn node_json(node: &TreeNode) -> TreeNodeJson {
    TreeNodeJson {
        id: node.item.id.clone(),
        description: node.item.description.clone(),
        status: node.item.status,
        substatus: node.item.substatus.clone(),
        progress: node.progress,
        percent: node.percent(),
        children: Vec::new(),
    }
}

pub fn item_to_json(item: &WorkItem) -> ItemJson {
    ItemJson {
        id: item.id.clone(),
        description: item.description.clone(),
        parent_id: item.parent_id.clone(),
        status: item.status,
        substatus: item.substatus.clone(),
        notes: item.notes.len(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn status_char(status: Status) -> char {
    match status {
        Status::NotStarted => ' ',
        Status::WorkInProgress => '>',
        Status::Completed => 'x',
    }
}

/// `work_in_progress/modeled`, or just the status when there is no substatus
fn status_label(status: Status, substatus: Option<&Substatus>) -> String {
    match substatus {
        Some(sub) if !sub.as_str().is_empty() => format!("{}/{}", status, sub),
        _ => status.to_string(),
    }
}

/// Format a single item as a one-line summary
pub fn format_item_line(item: &WorkItem) -> String {
    let parent = item
        .parent_id
        .as_ref()
        .map(|p| format!("  (in {})", p))
        .unwrap_or_default();
    format!(
        "[{}] {}  {}  {}{}",
        status_char(item.status),
        item.id,
        truncate_to_width(&item.description, MAX_DESC_WIDTH),
        status_label(item.status, item.substatus.as_ref()),
        parent
    )
}

/// Format the visible part of a tree, one line per node, children indented.
/// The percent and status columns line up across the whole tree.
pub fn format_tree(roots: &[TreeNode], visible: &HashSet<String>) -> Vec<String> {
    // A shown node's ancestors are always shown, so filtering the pre-order
    // walk keeps the tree shape intact
    let rows: Vec<(String, &TreeNode)> = flatten(roots)
        .into_iter()
        .filter(|(_, node)| visible.contains(node.id()))
        .map(|(depth, node)| {
            let left = format!(
                "{}[{}] {}  {}",
                "  ".repeat(depth),
                status_char(node.status()),
                node.id(),
                truncate_to_width(&node.item.description, MAX_DESC_WIDTH)
            );
            (left, node)
        })
        .collect();

    let width = rows.iter().map(|(left, _)| display_width(left)).max().unwrap_or(0);
    rows.into_iter()
        .map(|(left, node)| {
            format!(
                "{}  {:>3}%  {}",
                pad_to_width(&left, width),
                node.percent(),
                status_label(node.status(), node.substatus())
            )
        })
        .collect()
}

pub fn format_note_line(note: &Note) -> String {
    format!("{}  {}", note.date.format("%Y-%m-%d"), note.text)
}

/// Format BOM comparison rows as an aligned table
pub fn format_bom_table(rows: &[&BomDiff]) -> Vec<String> {
    let part_w = rows
        .iter()
        .map(|r| display_width(&r.part))
        .max()
        .unwrap_or(0)
        .max(4);
    let mut lines = vec![format!(
        "{}  {:>10}  {:>10}  Status",
        pad_to_width("Part", part_w),
        "Old",
        "New"
    )];
    for row in rows {
        lines.push(format!(
            "{}  {:>10}  {:>10}  {}",
            pad_to_width(&row.part, part_w),
            row.old_qty,
            row.new_qty,
            row.status
        ));
    }
    lines
}

/// Format catalog rows, part numbers in one column
pub fn format_parts(parts: &[&Part]) -> Vec<String> {
    let part_w = parts
        .iter()
        .map(|p| display_width(&p.part_number))
        .max()
        .unwrap_or(0);
    parts
        .iter()
        .map(|p| format!("{}  {}", pad_to_width(&p.part_number, part_w), p.description))
        .collect()
}

/// Format fuzzy hits with their scores
pub fn format_fuzzy_hits(hits: &[FuzzyHit<'_>]) -> Vec<String> {
    let part_w = hits
        .iter()
        .map(|h| display_width(&h.part.part_number))
        .max()
        .unwrap_or(0);
    hits.iter()
        .map(|h| {
            format!(
                "{:>6.2}  {}  {}",
                h.score,
                pad_to_width(&h.part.part_number, part_w),
                h.part.description
            )
        })
        .collect()
}

/// Parse a status string for the CLI
pub fn parse_status(s: &str) -> Result<Status, String> {
    Status::parse(s).ok_or_else(|| {
        format!(
            "unknown status '{}' (expected: not_started, work_in_progress, completed)",
            s
        )
    })
}
