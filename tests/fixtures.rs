//! End-to-end checks against captured API responses: response JSON in,
//! finished record out.

use std::fs;
use std::path::Path;

use country_cards::infobox::Infobox;
use country_cards::record::build;
use country_cards::wiki::{parse_image_url, parse_revision_markup};

fn fixture(filename: &str) -> serde_json::Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(filename);
    let text = fs::read_to_string(&path).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn image_url_resolves_from_the_commons_response() {
    let data = fixture("image_flag_afganistan.json");
    assert_eq!(
        parse_image_url(&data).unwrap(),
        "https://upload.wikimedia.org/wikipedia/commons/9/9a/Flag_of_Afghanistan.svg"
    );
}

#[test]
fn afghanistan_infobox_normalizes_to_the_expected_record() {
    let data = fixture("country_info_afganistan.json");
    let markup = parse_revision_markup(&data).unwrap();
    let info = build(&Infobox::parse(&markup, None)).unwrap();

    assert_eq!(info.name_translated, "República Islámica de Afganistán");
    assert_eq!(
        info.name_original.as_deref(),
        Some("د افغانستان اسلامي جمهوریت")
    );
    assert_eq!(info.capital_name, "Kabul");
    assert_eq!(info.languages, "Pastún, Darí (persa)");
    assert_eq!(info.demonyms, "Afgano/a");
    assert_eq!(info.iso_code, "AFG");
    assert_eq!(info.flag_image, "Flag of Afghanistan.svg");
    assert_eq!(
        info.world_location_image,
        "Afghanistan (orthographic projection).svg"
    );
}

#[test]
fn germany_infobox_normalizes_to_the_expected_record() {
    let data = fixture("country_info_alemania.json");
    let markup = parse_revision_markup(&data).unwrap();
    let info = build(&Infobox::parse(&markup, None)).unwrap();

    assert_eq!(info.name_translated, "República Federal de Alemania");
    assert_eq!(info.name_original.as_deref(), Some("Bundesrepublik Deutschland"));
    assert_eq!(info.capital_name, "Berlín");
    assert_eq!(info.languages, "Alemán");
    assert_eq!(info.demonyms, "Alemán/na, Germano/na, Tudesco/ca");
    assert_eq!(info.iso_code, "DEU");
    assert_eq!(info.flag_image, "Flag of Germany.svg");
    assert_eq!(info.world_location_image, "EU-Germany.svg");
}

#[test]
fn a_dependent_territory_builds_no_record() {
    let data = fixture("country_info_bermudas.json");
    let markup = parse_revision_markup(&data).unwrap();
    assert!(build(&Infobox::parse(&markup, None)).is_none());
}
