use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::util::natural_cmp;

static BOM_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+([\d.]+)$").expect("valid BOM line regex"));

/// A parsed bill of materials
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bom {
    /// Part number -> total quantity, in first-seen order
    pub parts: IndexMap<String, f64>,
    /// 1-based numbers of lines that could not be read, counted over
    /// non-empty lines
    pub invalid_lines: Vec<usize>,
}

impl Bom {
    pub fn is_valid(&self) -> bool {
        self.invalid_lines.is_empty()
    }
}

/// Parse `PART QTY` lines. Repeated parts have their quantities summed.
pub fn parse_bom(text: &str) -> Bom {
    let mut bom = Bom::default();
    let lines = text.trim().split('\n').filter(|l| !l.is_empty());
    for (idx, line) in lines.enumerate() {
        let line = line.trim();
        let parsed = BOM_LINE_RE.captures(line).and_then(|caps| {
            let qty: f64 = caps[2].parse().ok()?;
            Some((caps[1].to_string(), qty))
        });
        match parsed {
            Some((part, qty)) => *bom.parts.entry(part).or_insert(0.0) += qty,
            None if !line.is_empty() => bom.invalid_lines.push(idx + 1),
            None => {}
        }
    }
    bom
}

/// How a part differs between two BOMs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BomStatus {
    Added,
    Removed,
    #[serde(rename = "Qty Change")]
    QtyChange,
    Unchanged,
}

impl fmt::Display for BomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BomStatus::Added => write!(f, "Added"),
            BomStatus::Removed => write!(f, "Removed"),
            BomStatus::QtyChange => write!(f, "Qty Change"),
            BomStatus::Unchanged => write!(f, "Unchanged"),
        }
    }
}

/// One row of a BOM comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BomDiff {
    pub part: String,
    pub status: BomStatus,
    pub old_qty: f64,
    pub new_qty: f64,
}

/// Compare two BOMs with both sides' quantities multiplied by `scale`.
/// Rows are in natural part-number order.
pub fn compare_boms(old: &Bom, new: &Bom, scale: f64) -> Vec<BomDiff> {
    let mut parts: Vec<&String> = old.parts.keys().collect();
    parts.extend(new.parts.keys().filter(|p| !old.parts.contains_key(*p)));

    let mut rows: Vec<BomDiff> = parts
        .into_iter()
        .map(|part| {
            let old_qty = old.parts.get(part).copied().unwrap_or(0.0) * scale;
            let new_qty = new.parts.get(part).copied().unwrap_or(0.0) * scale;
            let status = if old_qty == 0.0 && new_qty > 0.0 {
                BomStatus::Added
            } else if old_qty > 0.0 && new_qty == 0.0 {
                BomStatus::Removed
            } else if old_qty != new_qty {
                BomStatus::QtyChange
            } else {
                BomStatus::Unchanged
            };
            BomDiff {
                part: part.clone(),
                status,
                old_qty,
                new_qty,
            }
        })
        .collect();
    rows.sort_by(|a, b| natural_cmp(&a.part, &b.part));
    rows
}

/// Which comparison rows to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BomFilter {
    #[default]
    All,
    /// Added, removed or quantity changed
    Changed,
    Only(BomStatus),
}

impl BomFilter {
    pub fn parse(s: &str) -> Option<BomFilter> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Some(BomFilter::All),
            "changed" => Some(BomFilter::Changed),
            "added" => Some(BomFilter::Only(BomStatus::Added)),
            "removed" => Some(BomFilter::Only(BomStatus::Removed)),
            "qty_change" | "qty-change" | "qty change" => Some(BomFilter::Only(BomStatus::QtyChange)),
            "unchanged" => Some(BomFilter::Only(BomStatus::Unchanged)),
            _ => None,
        }
    }

    pub fn matches(self, status: BomStatus) -> bool {
        match self {
            BomFilter::All => true,
            BomFilter::Changed => status != BomStatus::Unchanged,
            BomFilter::Only(s) => s == status,
        }
    }
}
