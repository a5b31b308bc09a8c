//! The fill stage: walk the dataset, fetch and normalize every country not
//! yet processed, and write the results back under the backup discipline.

use std::fs;
use std::path::Path;

use crate::error::PipelineError;
use crate::infobox::{Infobox, OVERRULES};
use crate::reconcile::{reconcile, CrossRefTable};
use crate::record::{self, CountryInfo};
use crate::store::{self, CountryEntry};
use crate::wiki::WikiClient;

/// What the fill loop needs from the outside world, separated so the loop
/// itself can run against canned data.
pub trait InfoSource {
    /// Fetch and normalize one entity's infobox. `Ok(None)` means the
    /// entity turned out not to be a country.
    fn country_info(&self, name: &str, url: &str) -> Result<Option<CountryInfo>, PipelineError>;

    /// Resolve an image filename to its upload URL.
    fn image_url(&self, filename: &str) -> Result<String, PipelineError>;
}

impl InfoSource for WikiClient {
    fn country_info(&self, name: &str, url: &str) -> Result<Option<CountryInfo>, PipelineError> {
        let title = url.rsplit('/').next().unwrap_or(url);
        let markup = self.revision_markup(title)?;
        let infobox = Infobox::parse(&markup, OVERRULES.get(name));
        Ok(record::build(&infobox))
    }

    fn image_url(&self, filename: &str) -> Result<String, PipelineError> {
        WikiClient::image_url(self, filename)
    }
}

/// Run the batch. Entities already flagged as processed are skipped, so an
/// interrupted run can simply be started again. Whatever completes before
/// an error is always flushed back to the dataset file; the backup is only
/// removed once everything, including the final write, went fine.
pub fn run_fill(db_path: &Path, codes_path: &Path) -> Result<(), PipelineError> {
    let backup = store::backup(db_path)?;

    let mut entries = store::load_dataset(db_path)?;
    println!("DB loaded ok");

    let table = CrossRefTable::load(codes_path)?;
    let client = WikiClient::new()?;

    let outcome = complete(&client, &table, &mut entries);

    println!("Writing DB");
    store::save_dataset(db_path, &entries)?;
    outcome?;

    if let Some(backup_path) = backup {
        fs::remove_file(backup_path)?;
    }
    println!("Done");
    Ok(())
}

fn complete(
    source: &dyn InfoSource,
    table: &CrossRefTable,
    entries: &mut [CountryEntry],
) -> Result<(), PipelineError> {
    for entry in entries.iter_mut() {
        if entry.processed {
            continue;
        }

        println!("Processing {:?} {}", entry.name, entry.url);

        let Some(info) = source.country_info(&entry.name, &entry.url)? else {
            // Not a country; flag it so re-runs don't fetch it again
            entry.processed = true;
            println!("Skipping! {:?}", entry.name);
            continue;
        };

        let flag_url = source.image_url(&info.flag_image)?;
        let wloc_url = source.image_url(&info.world_location_image)?;
        let code = reconcile(&entry.url, &entry.name, &info.iso_code, table);

        entry.fill(info, flag_url, wloc_url, code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Canned source that counts fetches and can be told to fail on a name.
    struct CannedSource {
        fetched: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl CannedSource {
        fn new(fail_on: Option<&'static str>) -> Self {
            CannedSource {
                fetched: RefCell::new(Vec::new()),
                fail_on,
            }
        }
    }

    impl InfoSource for CannedSource {
        fn country_info(
            &self,
            name: &str,
            _url: &str,
        ) -> Result<Option<CountryInfo>, PipelineError> {
            self.fetched.borrow_mut().push(name.to_string());
            if Some(name) == self.fail_on {
                return Err(PipelineError::MalformedResponse {
                    url: name.to_string(),
                    detail: "canned failure".into(),
                });
            }
            if name.starts_with("Territorio") {
                return Ok(None);
            }
            Ok(Some(CountryInfo {
                name_translated: format!("República de {}", name),
                name_original: None,
                capital_name: "Capital".into(),
                languages: "Español".into(),
                demonyms: "Alguno/a".into(),
                iso_code: "ESP".into(),
                flag_image: "f.svg".into(),
                world_location_image: "m.svg".into(),
            }))
        }

        fn image_url(&self, filename: &str) -> Result<String, PipelineError> {
            Ok(format!("https://upload.example/{}", filename))
        }
    }

    fn entry(name: &str, processed: bool) -> CountryEntry {
        let mut e = CountryEntry::seeded(
            name.to_string(),
            format!("https://es.wikipedia.org/wiki/{}", name.replace(' ', "_")),
            "Europa".into(),
        );
        e.processed = processed;
        e
    }

    fn empty_table() -> CrossRefTable {
        CrossRefTable::from_entries(HashMap::new())
    }

    #[test]
    fn processed_entries_are_never_fetched_again() {
        let source = CannedSource::new(None);
        let mut entries = vec![entry("Alemania", true), entry("Uruguay", false)];

        complete(&source, &empty_table(), &mut entries).unwrap();

        assert_eq!(*source.fetched.borrow(), vec!["Uruguay".to_string()]);
        assert!(entries[1].processed);
        assert_eq!(
            entries[1].name_translated.as_deref(),
            Some("República de Uruguay")
        );
    }

    #[test]
    fn non_countries_are_flagged_without_data() {
        let source = CannedSource::new(None);
        let mut entries = vec![entry("Territorio de Prueba", false)];

        complete(&source, &empty_table(), &mut entries).unwrap();

        assert!(entries[0].processed);
        assert_eq!(entries[0].name_translated, None);
        assert_eq!(entries[0].flag_url, None);
    }

    #[test]
    fn a_failed_entity_keeps_earlier_results_in_memory() {
        let source = CannedSource::new(Some("Uruguay"));
        let mut entries = vec![entry("Alemania", false), entry("Uruguay", false)];

        let err = complete(&source, &empty_table(), &mut entries).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse { .. }));

        // The first entity's work survives for the guaranteed flush
        assert!(entries[0].processed);
        assert_eq!(entries[0].code.as_deref(), Some("ESP"));
        assert!(!entries[1].processed);
    }

    #[test]
    fn reconciled_code_lands_on_the_entry() {
        let source = CannedSource::new(None);
        let table = CrossRefTable::from_entries(HashMap::from([(
            "https://es.wikipedia.org/wiki/Alemania".to_string(),
            "GER".to_string(),
        )]));
        let mut entries = vec![entry("Alemania", false)];

        complete(&source, &table, &mut entries).unwrap();
        assert_eq!(entries[0].code.as_deref(), Some("GER/ESP"));
        assert_eq!(
            entries[0].flag_url.as_deref(),
            Some("https://upload.example/f.svg")
        );
    }
}
