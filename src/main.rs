use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use country_cards::cards::{run_cards, CardOptions, SvgRenderer};
use country_cards::error::PipelineError;
use country_cards::images::{run_convert, run_download};
use country_cards::pipeline::run_fill;
use country_cards::scrape::{
    parse_country_table, parse_olympic_table, BASE_URL, COUNTRY_LIST_PAGE, OLYMPIC_CODES_PAGE,
};
use country_cards::store::{self, CountryEntry};
use country_cards::wiki::WikiClient;

#[derive(Parser)]
#[command(name = "country-cards")]
#[command(about = "Scrape country data from the Spanish Wikipedia and build trivia card artwork")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape the country list page and seed the dataset file
    Countries {
        /// Dataset file to (re)create
        #[arg(long, default_value = "countries_data.json")]
        db: PathBuf,
    },
    /// Scrape the Olympic committee code table
    Codes {
        /// Code table file to (re)create
        #[arg(long, default_value = "coi_data.json")]
        out: PathBuf,
    },
    /// Fetch and normalize the infobox of every pending country
    Fill {
        #[arg(long, default_value = "countries_data.json")]
        db: PathBuf,
        #[arg(long, default_value = "coi_data.json")]
        codes: PathBuf,
    },
    /// Download flag and world-location images for processed countries
    Images {
        #[arg(long, default_value = "countries_data.json")]
        db: PathBuf,
        #[arg(long, default_value = "images")]
        dir: PathBuf,
    },
    /// Rasterize downloaded images to PNG (runs inkscape)
    Convert {
        #[arg(long, default_value = "images")]
        src: PathBuf,
        #[arg(long, default_value = "pngs")]
        dst: PathBuf,
    },
    /// Generate the card artwork
    Cards {
        #[arg(long, default_value = "countries_data.json")]
        db: PathBuf,
        #[arg(long, default_value = "pngs")]
        pngs: PathBuf,
        #[arg(long, default_value = "templates")]
        templates: PathBuf,
        #[arg(long, default_value = "result")]
        out: PathBuf,
        /// Generate only the back cards
        #[arg(long)]
        only_backs: bool,
        /// Generate only the front cards
        #[arg(long)]
        only_fronts: bool,
        /// Restrict to one country, by reduced name
        #[arg(long)]
        country: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), PipelineError> {
    match command {
        Command::Countries { db } => run_countries(&db),
        Command::Codes { out } => run_codes(&out),
        Command::Fill { db, codes } => run_fill(&db, &codes),
        Command::Images { db, dir } => run_download(&db, &dir),
        Command::Convert { src, dst } => run_convert(&src, &dst),
        Command::Cards {
            db,
            pngs,
            templates,
            out,
            only_backs,
            only_fronts,
            country,
        } => run_cards(
            &db,
            &pngs,
            &templates,
            &out,
            &SvgRenderer,
            &CardOptions {
                only_fronts,
                only_backs,
                country: country.as_deref(),
            },
        ),
    }
}

fn run_countries(db: &Path) -> Result<(), PipelineError> {
    let client = WikiClient::new()?;
    let html = client.page_html(&format!("{}{}", BASE_URL, COUNTRY_LIST_PAGE))?;
    let rows = parse_country_table(&html)?;

    let entries: Vec<CountryEntry> = rows
        .into_iter()
        .map(|row| CountryEntry::seeded(row.name, row.url, row.continent))
        .collect();
    store::save_dataset(db, &entries)?;

    println!("Wrote {} countries to {:?}", entries.len(), db);
    Ok(())
}

fn run_codes(out: &Path) -> Result<(), PipelineError> {
    let client = WikiClient::new()?;
    let html = client.page_html(&format!("{}{}", BASE_URL, OLYMPIC_CODES_PAGE))?;
    let codes = parse_olympic_table(&html)?;

    let text = serde_json::to_string(&codes).map_err(|source| PipelineError::Json {
        path: out.to_path_buf(),
        source,
    })?;
    std::fs::write(out, text)?;

    println!("Wrote {} Olympic codes to {:?}", codes.len(), out);
    Ok(())
}
