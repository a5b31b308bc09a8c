//! Flag and world-location artwork: download the source files, then
//! rasterize them for the card templates.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::PipelineError;
use crate::store::{self, CountryEntry};
use crate::wiki::WikiClient;

/// Download every processed entry's flag and location images into `dir`,
/// skipping files already on disk. A failed download is reported and
/// skipped; the whole run keeps going.
pub fn run_download(db_path: &Path, dir: &Path) -> Result<(), PipelineError> {
    let entries = store::load_dataset(db_path)?;
    check_unique_names(&entries)?;
    println!("DB loaded ok");

    fs::create_dir_all(dir)?;
    let client = WikiClient::new()?;

    let done: Vec<&CountryEntry> = entries.iter().filter(|e| e.processed).collect();
    let pb = ProgressBar::new(done.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:30} {pos}/{len} {msg}")
            .unwrap(),
    );

    for entry in done {
        pb.set_message(entry.name.clone());

        if let Some(flag_url) = &entry.flag_url {
            download(&client, &pb, flag_url, &build_name(dir, &entry.name, "flag", flag_url))?;
        }
        if let Some(wloc_url) = &entry.world_location_url {
            download(
                &client,
                &pb,
                wloc_url,
                &build_name(dir, &entry.name, "location", wloc_url),
            )?;
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    println!("Done");
    Ok(())
}

/// Rasterize everything in `src_dir` into `dst_dir` as PNG, one inkscape
/// run per file.
pub fn run_convert(src_dir: &Path, dst_dir: &Path) -> Result<(), PipelineError> {
    if !src_dir.exists() {
        return Err(PipelineError::MissingInput(src_dir.to_path_buf()));
    }
    fs::create_dir_all(dst_dir)?;

    let mut sources: Vec<PathBuf> = fs::read_dir(src_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    sources.sort();

    for src in sources {
        let stem = src
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("imagen");
        let dst = dst_dir.join(format!("{}.png", stem));
        println!("{} -> {}", src.display(), dst.display());

        let status = Command::new("inkscape")
            .arg(format!("--export-png={}", dst.display()))
            .arg(&src)
            .status()
            .map_err(|err| PipelineError::CommandFailed {
                program: "inkscape".into(),
                detail: err.to_string(),
            })?;
        if !status.success() {
            return Err(PipelineError::CommandFailed {
                program: "inkscape".into(),
                detail: format!("exit {:?} for {}", status.code(), src.display()),
            });
        }
    }
    Ok(())
}

fn download(
    client: &WikiClient,
    pb: &ProgressBar,
    url: &str,
    destpath: &Path,
) -> Result<(), PipelineError> {
    if destpath.exists() {
        pb.println(format!("    skipping {:?}", destpath));
        return Ok(());
    }

    pb.println(format!("    downloading {:?} to {:?}", url, destpath));
    if let Some(bytes) = client.download(url)? {
        fs::write(destpath, bytes)?;
    }
    Ok(())
}

/// `<name>.<kind>.<ext>`, with the name cut at the first slash so variant
/// names ("Fiji / Fiyi") stay filesystem-safe.
fn build_name(dir: &Path, name: &str, kind: &str, url: &str) -> PathBuf {
    let name = name.split('/').next().unwrap_or(name).trim();
    let ext = url.rsplit('.').next().unwrap_or("svg");
    dir.join(format!("{}.{}.{}", name, kind, ext))
}

fn check_unique_names(entries: &[CountryEntry]) -> Result<(), PipelineError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.name.as_str()) {
            return Err(PipelineError::DuplicateName(entry.name.clone()));
        }
    }
    Ok(())
}
