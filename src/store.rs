//! Dataset persistence: the countries JSON file, and the backup discipline
//! that keeps a recoverable copy around while the file is being rewritten.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::record::CountryInfo;

/// One row of the dataset file. Seeded by the country-list scrape with the
/// first three fields; the fill stage adds the rest in place and flips
/// `__processed__`. Fields not yet filled stay out of the JSON entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub continent: String,

    #[serde(rename = "__processed__", default)]
    pub processed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_translated: Option<String>,
    // Doubly wrapped: a filled entry may genuinely carry null (source and
    // translated names coincide), which is distinct from not-yet-filled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_original: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demonyms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_location_url: Option<String>,

    // Manual annotation selecting an alternate back-card template for
    // countries whose names or language lists overflow the common layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl CountryEntry {
    pub fn seeded(name: String, url: String, continent: String) -> Self {
        CountryEntry {
            name,
            url,
            continent,
            processed: false,
            name_translated: None,
            name_original: None,
            capital_name: None,
            languages: None,
            demonyms: None,
            code: None,
            flag_url: None,
            world_location_url: None,
            style: None,
        }
    }

    /// Record the fill results and mark the entry done.
    pub fn fill(&mut self, info: CountryInfo, flag_url: String, wloc_url: String, code: String) {
        self.name_translated = Some(info.name_translated);
        self.name_original = Some(info.name_original);
        self.capital_name = Some(info.capital_name);
        self.languages = Some(info.languages);
        self.demonyms = Some(info.demonyms);
        self.code = Some(code);
        self.flag_url = Some(flag_url);
        self.world_location_url = Some(wloc_url);
        self.processed = true;
    }
}

pub fn load_dataset(path: &Path) -> Result<Vec<CountryEntry>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_dataset(path: &Path, entries: &[CountryEntry]) -> Result<(), PipelineError> {
    let text = serde_json::to_string(entries).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text)?;
    Ok(())
}

/// Copy the dataset aside as `.name.bkp` before rewriting it. Returns the
/// backup path, or `None` when there is nothing to back up yet.
pub fn backup(path: &Path) -> Result<Option<PathBuf>, PipelineError> {
    if !path.exists() {
        return Ok(None);
    }
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("dataset");
    let backup_path = path.with_file_name(format!(".{}.bkp", filename));

    println!("Doing backup from {:?} to {:?}", path, backup_path);
    if backup_path.exists() {
        fs::remove_file(&backup_path)?;
    }
    fs::copy(path, &backup_path)?;
    Ok(Some(backup_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<CountryEntry> {
        let mut done = CountryEntry::seeded(
            "Alemania".into(),
            "https://es.wikipedia.org/wiki/Alemania".into(),
            "Europa".into(),
        );
        done.fill(
            CountryInfo {
                name_translated: "República Federal de Alemania".into(),
                name_original: Some("Bundesrepublik Deutschland".into()),
                capital_name: "Berlín".into(),
                languages: "Alemán".into(),
                demonyms: "Alemán/na".into(),
                iso_code: "DEU".into(),
                flag_image: "Flag of Germany.svg".into(),
                world_location_image: "EU-Germany.svg".into(),
            },
            "https://upload.wikimedia.org/flag.svg".into(),
            "https://upload.wikimedia.org/map.svg".into(),
            "GER/DEU".into(),
        );
        let pending = CountryEntry::seeded(
            "Uruguay".into(),
            "https://es.wikipedia.org/wiki/Uruguay".into(),
            "América".into(),
        );
        vec![done, pending]
    }

    #[test]
    fn dataset_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("countries_data.json");

        save_dataset(&path, &sample()).unwrap();
        let loaded = load_dataset(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].processed);
        assert_eq!(loaded[0].code.as_deref(), Some("GER/DEU"));
        assert!(!loaded[1].processed);
        assert_eq!(loaded[1].capital_name, None);
    }

    #[test]
    fn unfilled_fields_stay_out_of_the_json() {
        let text = serde_json::to_string(&sample()).unwrap();
        let values: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(values[1].get("capital_name").is_none());
        assert!(values[1].get("name_original").is_none());
        assert_eq!(values[1]["__processed__"], false);
    }

    #[test]
    fn null_original_name_survives_a_roundtrip() {
        let mut entries = sample();
        entries[0].name_original = Some(None);
        let text = serde_json::to_string(&entries).unwrap();
        let loaded: Vec<CountryEntry> = serde_json::from_str(&text).unwrap();
        assert_eq!(loaded[0].name_original, Some(None));
    }

    #[test]
    fn backup_copies_then_reports_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("countries_data.json");
        save_dataset(&path, &sample()).unwrap();

        let backup_path = backup(&path).unwrap().unwrap();
        assert!(backup_path.exists());
        assert_eq!(
            backup_path.file_name().unwrap().to_str().unwrap(),
            ".countries_data.json.bkp"
        );
        assert_eq!(
            fs::read_to_string(&backup_path).unwrap(),
            fs::read_to_string(&path).unwrap()
        );
    }

    #[test]
    fn backup_of_a_missing_dataset_is_a_noop() {
        let dir = tempdir().unwrap();
        assert!(backup(&dir.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn loading_a_missing_dataset_names_the_file() {
        let err = load_dataset(Path::new("/no/such/file.json")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }
}
