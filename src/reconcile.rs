//! Attach the Olympic committee code to each country, reconciling the naming
//! differences between the country list and the code table.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lazy_static::lazy_static;

use crate::error::PipelineError;

/// Entries whose spelling differs between the two source tables, plus the
/// entities that legitimately have no Olympic code at all.
enum Fixup {
    Rename(&'static str),
    NoCode,
}

lazy_static! {
    static ref FIXUPS: HashMap<&'static str, Fixup> = {
        let mut m = HashMap::new();
        // The country list keeps the colonial-era name
        m.insert("Birmania", Fixup::Rename("Myanmar"));
        // No national Olympic committee exists; don't warn about it
        m.insert("Ciudad del Vaticano", Fixup::NoCode);
        m
    };
}

/// Read-only lookup table from entity key to Olympic code, loaded wholesale
/// before reconciliation begins.
pub struct CrossRefTable {
    codes: HashMap<String, String>,
}

impl CrossRefTable {
    /// Load the code table and normalize its keys down to the last URL path
    /// segment, in both raw and percent-decoded spellings.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::MissingInput(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let raw: HashMap<String, String> =
            serde_json::from_str(&text).map_err(|source| PipelineError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_entries(raw))
    }

    pub fn from_entries(raw: HashMap<String, String>) -> Self {
        let mut codes = HashMap::new();
        for (key, code) in raw {
            let segment = last_segment(&key);
            if let Ok(decoded) = urlencoding::decode(segment) {
                codes.insert(decoded.into_owned(), code.clone());
            }
            codes.insert(segment.to_string(), code);
        }
        CrossRefTable { codes }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.codes.get(key).map(String::as_str)
    }
}

/// Compose the code shown on the card: the Olympic code and the ISO code,
/// joined when they differ, ISO alone when they match or when no Olympic
/// code can be found.
pub fn reconcile(url: &str, name: &str, iso_code: &str, table: &CrossRefTable) -> String {
    let mut suppress_warning = false;
    let mut candidates: Vec<String> = Vec::new();

    // Fixups first, so a renamed entity is tried under its table spelling
    for alias in [name, last_segment(url)] {
        match FIXUPS.get(alias) {
            Some(Fixup::Rename(renamed)) => candidates.push((*renamed).to_string()),
            Some(Fixup::NoCode) => suppress_warning = true,
            None => {}
        }
    }

    // The URL tail in its raw, percent-encoded and percent-decoded forms
    let segment = last_segment(url);
    candidates.push(segment.to_string());
    candidates.push(urlencoding::encode(segment).into_owned());
    if let Ok(decoded) = urlencoding::decode(segment) {
        candidates.push(decoded.into_owned());
    }

    // The display name and each of its slash-separated parts
    candidates.push(name.to_string());
    for part in name.split('/') {
        candidates.push(part.trim().to_string());
    }

    // Every candidate again with underscores and spaces interchanged
    for candidate in candidates.clone() {
        candidates.push(candidate.replace('_', " "));
        candidates.push(candidate.replace(' ', "_"));
    }

    let mut seen = HashSet::new();
    for candidate in candidates {
        if candidate.is_empty() || !seen.insert(candidate.clone()) {
            continue;
        }
        if let Some(code) = table.lookup(&candidate) {
            return compose(code, iso_code);
        }
    }

    if !suppress_warning {
        println!("    WARNING! no Olympic code found for {:?} ({})", name, url);
    }
    iso_code.to_string()
}

fn compose(olympic: &str, iso: &str) -> String {
    if olympic.is_empty() || olympic == iso {
        iso.to_string()
    } else if iso.is_empty() {
        olympic.to_string()
    } else {
        format!("{}/{}", olympic, iso)
    }
}

fn last_segment(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
