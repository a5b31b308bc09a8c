//! Build one normalized country record out of an extracted infobox.

use crate::infobox::Infobox;
use crate::reduce::{reduce, split_breaks};

/// Normalized per-country data, straight out of the infobox.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryInfo {
    pub name_translated: String,
    pub name_original: Option<String>,
    pub capital_name: String,
    pub languages: String,
    pub demonyms: String,
    pub iso_code: String,
    /// Commons filename of the flag, not yet resolved to an upload URL
    pub flag_image: String,
    /// Commons filename of the world-location map
    pub world_location_image: String,
}

/// Assemble a record for one entity, or `None` when the infobox describes a
/// dependent territory rather than a sovereign country.
pub fn build(infobox: &Infobox) -> Option<CountryInfo> {
    // Dependencies either name the country they belong to or describe
    // themselves as a territory in the government field. Checked before any
    // other lookup so non-countries never trigger missing-field noise.
    if infobox.has("país") {
        return None;
    }
    if infobox.get(&["gobierno"], false).contains("Territorio") {
        return None;
    }

    // The official name packs translated and native-script forms on one
    // line, separated by an explicit break
    let official = infobox.get(&["nombre_oficial"], false);
    let names = split_breaks(&official);
    let name_translated = reduce(names[0]);
    let name_original = names.get(1).map(|raw| reduce(raw));

    let languages = join_reduced(&infobox.get(&["idiomas_oficiales", "idioma_oficial"], false));
    let demonyms = join_reduced(&infobox.get(&["gentilicio"], false));

    let capital_name = reduce(&infobox.get(&["capital", "capital_administrativa"], false));
    let flag_image = reduce(&infobox.get(&["imagen_bandera", "bandera"], false));
    let world_location_image = reduce(&infobox.get(&["imagen_mapa", "mapa"], false));
    let iso_code = parse_iso_code(&infobox.get(&["ISO", "código_ISO"], false));

    Some(CountryInfo {
        name_translated,
        name_original,
        capital_name,
        languages,
        demonyms,
        iso_code,
        flag_image,
        world_location_image,
    })
}

/// Multi-valued fields: split on breaks, reduce each part, rejoin.
fn join_reduced(raw: &str) -> String {
    split_breaks(raw)
        .into_iter()
        .map(reduce)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The ISO field interleaves numeric, alpha-2 and alpha-3 codes in varying
/// order ("004 / AFG / AF"). Keep the alpha-3 segment.
fn parse_iso_code(raw: &str) -> String {
    raw.split('/')
        .map(str::trim)
        .find(|part| part.len() == 3 && part.chars().all(|c| c.is_ascii_alphabetic()))
        .map(|part| part.to_ascii_uppercase())
        .unwrap_or_default()
}
