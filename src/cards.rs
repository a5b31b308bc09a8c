//! Card generation: turn the filled dataset into front/back artwork through
//! a templating boundary.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::thread_rng;
use unicode_normalization::UnicodeNormalization;

use crate::error::PipelineError;
use crate::scrape::attr_value;
use crate::store;

const FRONT_TEMPLATE: &str = "card-front.svg";
const PLACEMENT_RECTANGLE: &str = "rect19351";

/// Flat per-card fields handed to the renderer.
pub type CardFields = BTreeMap<String, String>;

/// Where a per-record image goes on the template.
pub struct ImagePlacement {
    pub rectangle_id: String,
    pub path_field: String,
    pub placement: String,
}

/// The templating engine boundary: one call renders a whole batch of cards
/// from one template, invoking the progress callback once per record.
pub trait CardRenderer {
    fn process(
        &self,
        template: &Path,
        output_prefix: &Path,
        key_field: &str,
        records: &[CardFields],
        images: &[ImagePlacement],
        progress: &mut dyn FnMut(&CardFields),
    ) -> Result<(), PipelineError>;
}

/// One fully prepared card, assembled from a filled dataset entry.
#[derive(Debug, Clone)]
pub struct CardRecord {
    pub name: String,
    pub continent: String,
    pub name_translated: String,
    /// Empty when the source had no separate native-script form
    pub name_original: String,
    pub capital: String,
    pub languages: String,
    pub demonyms: String,
    pub code: String,
    pub style: Option<String>,
    /// ASCII-folded sort key, also the per-card output filename key
    pub reduced_name: String,
    /// Shuffled per-run identifier, decorrelated from alphabetical order
    pub ridx: String,
    pub progress: String,
    pub wflag_path: PathBuf,
    pub wloc_path: PathBuf,
}

pub struct CardOptions<'a> {
    pub only_fronts: bool,
    pub only_backs: bool,
    pub country: Option<&'a str>,
}

pub fn run_cards(
    db_path: &Path,
    pngs_dir: &Path,
    templates_dir: &Path,
    out_dir: &Path,
    renderer: &dyn CardRenderer,
    opts: &CardOptions,
) -> Result<(), PipelineError> {
    fs::create_dir_all(out_dir)?;
    let records = load_cards(db_path, pngs_dir)?;

    if !opts.only_backs {
        generate_fronts(&records, renderer, templates_dir, out_dir, opts.country)?;
    }
    if !opts.only_fronts {
        generate_backs(&records, renderer, templates_dir, out_dir, opts.country)?;
    }
    Ok(())
}

/// Load the filled entries and prepare them for rendering: verify the local
/// artwork exists, assign sort keys and shuffled identifiers, and compute
/// the progress labels in sorted order.
pub fn load_cards(db_path: &Path, pngs_dir: &Path) -> Result<Vec<CardRecord>, PipelineError> {
    let entries = store::load_dataset(db_path)?;

    // Processed-but-empty entries are the skipped non-countries
    let filled: Vec<_> = entries
        .into_iter()
        .filter(|e| e.processed && e.name_translated.is_some())
        .collect();

    // Dense id pool, shuffled so a card's visible id gives away nothing
    // about its alphabetical position
    let mut id_pool: Vec<String> = (1..=filled.len()).map(|i| format!("{:02X}", i)).collect();
    id_pool.shuffle(&mut thread_rng());

    let mut records = Vec::with_capacity(filled.len());
    for entry in filled {
        let name_translated = entry.name_translated.unwrap_or_default();
        let name_original = match entry.name_original.flatten() {
            // No point showing both when they coincide
            Some(original) if original != name_translated => original,
            _ => String::new(),
        };

        let base = entry.name.split('/').next().unwrap_or(&entry.name).trim();
        let wloc_path = asset_path(pngs_dir, base, "location")?;
        let wflag_path = asset_path(pngs_dir, base, "flag")?;

        records.push(CardRecord {
            reduced_name: reduced_name(&entry.name),
            ridx: id_pool.pop().expect("one id per record"),
            progress: String::new(),
            name: entry.name,
            continent: entry.continent,
            name_translated,
            name_original,
            capital: entry.capital_name.unwrap_or_default(),
            languages: entry.languages.unwrap_or_default(),
            demonyms: entry.demonyms.unwrap_or_default(),
            code: entry.code.unwrap_or_default(),
            style: entry.style,
            wflag_path,
            wloc_path,
        });
    }

    records.sort_by(|a, b| a.reduced_name.cmp(&b.reduced_name));
    let total = records.len();
    for (idx, record) in records.iter_mut().enumerate() {
        record.progress = format!(
            "{} ({}) - {}/{}",
            record.name,
            record.reduced_name,
            idx + 1,
            total
        );
    }

    Ok(records)
}

/// Fronts carry just the flag.
pub fn generate_fronts(
    records: &[CardRecord],
    renderer: &dyn CardRenderer,
    templates_dir: &Path,
    out_dir: &Path,
    country: Option<&str>,
) -> Result<(), PipelineError> {
    let replace_info: Vec<CardFields> = records
        .iter()
        .filter(|r| country.map_or(true, |c| r.reduced_name == c))
        .map(|r| {
            CardFields::from([
                ("wflag_path".into(), r.wflag_path.display().to_string()),
                ("progress".into(), r.progress.clone()),
                ("reduced_name".into(), r.reduced_name.clone()),
                ("idx".into(), r.ridx.clone()),
            ])
        })
        .collect();

    renderer.process(
        &templates_dir.join(FRONT_TEMPLATE),
        &out_dir.join("card-front"),
        "reduced_name",
        &replace_info,
        &[flag_placement("wflag_path")],
        &mut print_progress,
    )
}

/// Backs carry everything else, split per template style.
pub fn generate_backs(
    records: &[CardRecord],
    renderer: &dyn CardRenderer,
    templates_dir: &Path,
    out_dir: &Path,
    country: Option<&str>,
) -> Result<(), PipelineError> {
    let mut per_style: BTreeMap<&'static str, Vec<CardFields>> = BTreeMap::new();

    for record in records {
        if country.is_some_and(|c| record.reduced_name != c) {
            continue;
        }

        let template = back_template(record.style.as_deref())?;

        let lang_title = if is_single(&record.languages) { "Idioma" } else { "Idiomas" };
        let demonym_title = if is_single(&record.demonyms) {
            "Gentilicio"
        } else {
            "Gentilicios"
        };

        per_style.entry(template).or_default().push(CardFields::from([
            ("continent".into(), record.continent.clone()),
            ("capital".into(), record.capital.clone()),
            ("lang_title".into(), lang_title.into()),
            ("lang_content".into(), record.languages.clone()),
            ("demonym_title".into(), demonym_title.into()),
            ("demonym_content".into(), record.demonyms.clone()),
            ("codes".into(), record.code.clone()),
            ("original_name".into(), record.name_original.clone()),
            ("translated_name".into(), record.name_translated.clone()),
            ("simple_name".into(), record.name.clone()),
            ("wloc_path".into(), record.wloc_path.display().to_string()),
            ("progress".into(), record.progress.clone()),
            ("reduced_name".into(), record.reduced_name.clone()),
            ("idx".into(), record.ridx.clone()),
            ("style".into(), record.style.clone().unwrap_or_else(|| "common".into())),
        ]));
    }

    for (template, replace_info) in per_style {
        renderer.process(
            &templates_dir.join(template),
            &out_dir.join("card-back"),
            "reduced_name",
            &replace_info,
            &[flag_placement("wloc_path")],
            &mut print_progress,
        )?;
    }
    Ok(())
}

fn print_progress(fields: &CardFields) {
    println!("  {}", fields.get("progress").map(String::as_str).unwrap_or(""));
}

fn flag_placement(path_field: &str) -> ImagePlacement {
    ImagePlacement {
        rectangle_id: PLACEMENT_RECTANGLE.into(),
        path_field: path_field.into(),
        placement: "center".into(),
    }
}

fn back_template(style: Option<&str>) -> Result<&'static str, PipelineError> {
    match style {
        None => Ok("card-back-common.svg"),
        Some("long-languages") => Ok("card-back-lang.svg"),
        Some("long-demonyms") => Ok("card-back-dem.svg"),
        Some("long-languages-and-countryname") => Ok("card-back-lang-cntry.svg"),
        Some("long-countryname") => Ok("card-back-cntry.svg"),
        Some(other) => Err(PipelineError::UnknownStyle(other.to_string())),
    }
}

/// More than one language/demonym changes the card title to plural.
fn is_single(text: &str) -> bool {
    const INDICATORS: [&str; 3] = [", ", " y ", " e "];
    !INDICATORS.iter().any(|ind| text.contains(ind))
}

/// Diacritics stripped, spaces and slashes removed, lower-cased: a stable
/// sort key that is also safe in file paths.
fn reduced_name(name: &str) -> String {
    name.replace(['/', ' '], "")
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase()
}

/// Absolute path of a required card image; missing artwork aborts the run
/// before anything is rendered.
fn asset_path(pngs_dir: &Path, base: &str, kind: &str) -> Result<PathBuf, PipelineError> {
    let path = pngs_dir.join(format!("{}.{}.png", base, kind));
    if !path.exists() {
        println!("exist? false {:?}", path);
        return Err(PipelineError::MissingAsset(path));
    }
    Ok(fs::canonicalize(&path)?)
}

/* ---------------- the production renderer ---------------- */

/// Text-substitution SVG renderer: replaces `{{field}}` placeholders and
/// points the placement rectangle at the record's image, one output file per
/// record. Rasterization is someone else's job.
pub struct SvgRenderer;

impl CardRenderer for SvgRenderer {
    fn process(
        &self,
        template: &Path,
        output_prefix: &Path,
        key_field: &str,
        records: &[CardFields],
        images: &[ImagePlacement],
        progress: &mut dyn FnMut(&CardFields),
    ) -> Result<(), PipelineError> {
        if !template.exists() {
            return Err(PipelineError::MissingInput(template.to_path_buf()));
        }
        let body = fs::read_to_string(template)?;

        for record in records {
            let key = record.get(key_field).ok_or_else(|| {
                PipelineError::Render(format!("record without key field {:?}", key_field))
            })?;

            let mut svg = body.clone();
            for (field, value) in record {
                svg = svg.replace(&format!("{{{{{}}}}}", field), value);
            }
            for placement in images {
                svg = place_image(&svg, placement, record)?;
            }

            let out = format!("{}-{}.svg", output_prefix.display(), key);
            fs::write(&out, svg)?;
            progress(record);
        }
        Ok(())
    }
}

/// Swap the placement rectangle for an `<image>` element of the same
/// geometry, pointing at the record's image path.
fn place_image(
    svg: &str,
    placement: &ImagePlacement,
    record: &CardFields,
) -> Result<String, PipelineError> {
    let path = record.get(&placement.path_field).ok_or_else(|| {
        PipelineError::Render(format!("record without path field {:?}", placement.path_field))
    })?;

    let needle = format!("id=\"{}\"", placement.rectangle_id);
    let at = svg.find(&needle).ok_or_else(|| {
        PipelineError::Render(format!(
            "no placement rectangle {:?} in template",
            placement.rectangle_id
        ))
    })?;

    let start = svg[..at]
        .rfind('<')
        .ok_or_else(|| PipelineError::Render("placement id outside any element".into()))?;
    let opener_end = start
        + svg[start..]
            .find('>')
            .ok_or_else(|| PipelineError::Render("unterminated placement element".into()))?
        + 1;
    let opener = &svg[start..opener_end];

    // <rect .../> is the usual case; tolerate a separate closing tag too
    let mut end = opener_end;
    if !opener.trim_end_matches('>').ends_with('/') {
        let tag: String = svg[start + 1..]
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '>')
            .collect();
        let close = format!("</{}>", tag);
        end = svg[opener_end..]
            .find(&close)
            .map(|rel| opener_end + rel + close.len())
            .unwrap_or(opener_end);
    }

    let geometry = |name: &str| attr_value(opener, name).unwrap_or("0").to_string();
    let aspect = if placement.placement == "center" {
        "xMidYMid meet"
    } else {
        "none"
    };
    let image = format!(
        "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"{}\" xlink:href=\"{}\"/>",
        geometry("x"),
        geometry("y"),
        geometry("width"),
        geometry("height"),
        aspect,
        path
    );

    let mut out = String::with_capacity(svg.len() + image.len());
    out.push_str(&svg[..start]);
    out.push_str(&image);
    out.push_str(&svg[end..]);
    Ok(out)
}
