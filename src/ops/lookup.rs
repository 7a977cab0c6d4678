use std::fs;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize};

/// Error type for part lookups
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no parts catalog configured (set lookup.catalog or pass --catalog)")]
    NoCatalog,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse parts catalog {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(deserialize_with = "string_or_number")]
    pub part_number: String,
    #[serde(default)]
    pub description: String,
}

/// Catalog exports carry numeric part numbers as JSON numbers.
fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}

/// Load a catalog file (JSON array of parts).
pub fn load_catalog(path: &Path) -> Result<Vec<Part>, LookupError> {
    let text = fs::read_to_string(path).map_err(|e| LookupError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| LookupError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Wildcard lookup
// ---------------------------------------------------------------------------

/// Compile a shell-style wildcard (`*` any run, `?` one char) into an
/// anchored, case-insensitive regex. Everything else matches literally.
pub fn wildcard_regex(pattern: &str) -> Result<Regex, LookupError> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');
    Ok(RegexBuilder::new(&re).case_insensitive(true).build()?)
}

/// Parts whose number and description match the given wildcards. A missing
/// or blank pattern matches everything.
pub fn lookup<'a>(
    parts: &'a [Part],
    part_pattern: Option<&str>,
    desc_pattern: Option<&str>,
) -> Result<Vec<&'a Part>, LookupError> {
    let compile = |p: Option<&str>| -> Result<Option<Regex>, LookupError> {
        match p.map(str::trim) {
            Some(p) if !p.is_empty() => Ok(Some(wildcard_regex(p)?)),
            _ => Ok(None),
        }
    };
    let part_re = compile(part_pattern)?;
    let desc_re = compile(desc_pattern)?;

    Ok(parts
        .iter()
        .filter(|p| part_re.as_ref().is_none_or(|re| re.is_match(&p.part_number)))
        .filter(|p| desc_re.as_ref().is_none_or(|re| re.is_match(&p.description)))
        .collect())
}

// ---------------------------------------------------------------------------
// Fuzzy search
// ---------------------------------------------------------------------------

/// Lowercase, turn anything other than `a-z 0-9 - ° / .` into spaces and
/// collapse whitespace.
pub fn normalize(s: &str) -> String {
    let mapped: String = s
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '°' | '/' | '.') {
                c
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let cost = if ca == cb { 0 } else { 1 };
            row[j + 1] = (above + 1).min(row[j] + 1).min(diag + cost);
            diag = above;
        }
    }
    row[b.len()]
}

/// Relevance of one catalog row for normalized query tokens.
///
/// Each token scores 2 when it occurs in the row text, otherwise up to 2 for
/// the closest word by edit distance. Bonuses: part number starts with the
/// first token (+1.5), description contains the whole query (+1), and 0.25
/// per exact token hit.
pub fn score(tokens: &[&str], description: &str, part_number: &str) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let text = normalize(&format!("{} {}", part_number, description));
    let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();

    let mut total = 0.0;
    let mut exact = 0;
    for token in tokens {
        if text.contains(token) {
            total += 2.0;
            exact += 1;
        } else {
            let best = words
                .iter()
                .map(|w| edit_distance(token, w))
                .min()
                .unwrap_or(usize::MAX);
            total += (2.0 - best as f64 * 0.5).max(0.0);
        }
    }

    if normalize(part_number).starts_with(tokens[0]) {
        total += 1.5;
    }
    if normalize(description).contains(&tokens.join(" ")) {
        total += 1.0;
    }
    total + exact as f64 * 0.25
}

/// A scored fuzzy match
#[derive(Debug, Clone, Serialize)]
pub struct FuzzyHit<'a> {
    pub score: f64,
    #[serde(flatten)]
    pub part: &'a Part,
}

/// Best `limit` catalog rows for a free-text query, highest score first.
pub fn fuzzy_search<'a>(parts: &'a [Part], query: &str, limit: usize) -> Vec<FuzzyHit<'a>> {
    let normalized = normalize(query);
    let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<FuzzyHit<'a>> = parts
        .iter()
        .filter_map(|part| {
            let s = score(&tokens, &part.description, &part.part_number);
            (s > 0.0).then_some(FuzzyHit { score: s, part })
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}
