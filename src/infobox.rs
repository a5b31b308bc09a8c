//! Infobox field extraction: turn the raw revision wikitext into a flat
//! key -> value map with a fallback-chain lookup.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A |identifier= token starts a new infobox parameter. Some revisions
    // pack several parameters on one physical line, so a separator is
    // inserted before every token prior to splitting.
    static ref RE_PARAM_BOUNDARY: Regex = Regex::new(r"\|\s*(\w[\w ]*?)\s*=").unwrap();
}

/// Known-bad source values, keyed by entity name. Values here win over
/// whatever the page says.
pub type OverruleTable = HashMap<&'static str, HashMap<&'static str, &'static str>>;

lazy_static! {
    pub static ref OVERRULES: OverruleTable = {
        let mut table = OverruleTable::new();
        // The Vatican infobox carries no demonym usable on a card
        let mut vatican = HashMap::new();
        vatican.insert("gentilicio", "Vaticano, -a");
        table.insert("Ciudad del Vaticano", vatican);
        table
    };
}

/// Flat view over one entity's infobox parameters.
pub struct Infobox<'a> {
    fields: HashMap<String, String>,
    overrules: Option<&'a HashMap<&'static str, &'static str>>,
}

impl<'a> Infobox<'a> {
    /// Split the raw blob into parameter lines and fold them into a map.
    /// Later duplicates overwrite earlier ones.
    pub fn parse(raw: &str, overrules: Option<&'a HashMap<&'static str, &'static str>>) -> Self {
        let separated = RE_PARAM_BOUNDARY.replace_all(raw, "\n|${1}=");

        let mut fields = HashMap::new();
        for line in separated.lines() {
            let line = line.trim();
            let Some(param) = line.strip_prefix('|') else {
                continue;
            };
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }

        Infobox { fields, overrules }
    }

    /// True if the key is present, either as an overrule or in the page.
    pub fn has(&self, key: &str) -> bool {
        self.overrule(key).is_some() || self.fields.contains_key(key)
    }

    /// Look keys up in order, overrules first, and return the first value
    /// found. A miss on every key prints a diagnostic (unless silent) and
    /// yields an empty string; it never fails.
    pub fn get(&self, keys: &[&str], silent: bool) -> String {
        for key in keys {
            if let Some(value) = self.overrule(key) {
                return value.to_string();
            }
            if let Some(value) = self.fields.get(*key) {
                return value.clone();
            }
        }
        if !silent {
            println!("    WARNING! keys not found: {:?}", keys);
        }
        String::new()
    }

    fn overrule(&self, key: &str) -> Option<&str> {
        self.overrules.and_then(|map| map.get(key).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = "\
{{Ficha de país
| nombre_oficial = República de Pruebas
| capital = [[Villa Prueba]]
| gentilicio = Probador, -ra
}}";

    #[test]
    fn parses_one_parameter_per_line() {
        let ib = Infobox::parse(BLOB, None);
        assert_eq!(ib.get(&["nombre_oficial"], true), "República de Pruebas");
        assert_eq!(ib.get(&["capital"], true), "[[Villa Prueba]]");
    }

    #[test]
    fn tolerates_parameters_packed_on_one_line() {
        let ib = Infobox::parse("|capital=[[Quito]] |gentilicio = Ecuatoriano, -na", None);
        assert_eq!(ib.get(&["capital"], true), "[[Quito]]");
        assert_eq!(ib.get(&["gentilicio"], true), "Ecuatoriano, -na");
    }

    #[test]
    fn later_duplicates_win() {
        let ib = Infobox::parse("|capital = Antigua\n|capital = Nueva", None);
        assert_eq!(ib.get(&["capital"], true), "Nueva");
    }

    #[test]
    fn lines_without_equals_are_dropped() {
        let ib = Infobox::parse("|solo una celda\n|capital = Lima", None);
        assert!(!ib.has("solo una celda"));
        assert_eq!(ib.get(&["capital"], true), "Lima");
    }

    #[test]
    fn fallback_chain_returns_first_present_key() {
        let ib = Infobox::parse("|idioma_oficial = Español", None);
        assert_eq!(
            ib.get(&["idiomas_oficiales", "idioma_oficial"], true),
            "Español"
        );
    }

    #[test]
    fn missing_keys_yield_empty_string() {
        let ib = Infobox::parse(BLOB, None);
        assert_eq!(ib.get(&["no_existe"], true), "");
    }

    #[test]
    fn overrules_win_over_page_values() {
        let mut patch = HashMap::new();
        patch.insert("gentilicio", "Corregido, -da");
        let ib = Infobox::parse(BLOB, Some(&patch));
        assert_eq!(ib.get(&["gentilicio"], true), "Corregido, -da");
        assert!(ib.has("gentilicio"));
    }

    #[test]
    fn overrule_only_keys_count_as_present() {
        let mut patch = HashMap::new();
        patch.insert("gentilicio", "Vaticano, -a");
        let ib = Infobox::parse("|capital = Roma", Some(&patch));
        assert!(ib.has("gentilicio"));
        assert_eq!(ib.get(&["gentilicio"], true), "Vaticano, -a");
    }
}
