mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, SelectArgs};
use dotenv::dotenv;
use progress::CliReporter;
use subcrawl_core::media::{CatalogLookup, OfflineCatalog, OmdbCatalog};
use subcrawl_core::storage::MediaTable;
use subcrawl_core::subtitles::{CycleState, LanguageDirectory, OpenSubtitlesClient};
use subcrawl_core::{AppConfig, CancelToken, Library};
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match subcrawl_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Scan { path }) => run_scan(&config, &path),
        Some(Commands::List {
            selected,
            with_subs,
            without_subs,
        }) => {
            let subtitles = match (with_subs, without_subs) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            run_list(&config, selected, subtitles)
        }
        Some(Commands::Select(select)) => run_select(&config, select),
        Some(Commands::Deselect) => run_deselect(&config),
        Some(Commands::Remove { id }) => run_remove(&config, &id),
        Some(Commands::Download { language }) => run_download(&config, language.as_deref()),
        Some(Commands::Clear) => run_clear(&config),
        Some(Commands::Languages) => run_languages(&config),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn catalog_for(config: &AppConfig) -> anyhow::Result<Box<dyn CatalogLookup>> {
    match config.omdb_api_key.as_deref() {
        Some(key) if !key.is_empty() => Ok(Box::new(OmdbCatalog::new(key)?)),
        _ => Ok(Box::new(OfflineCatalog)),
    }
}

fn run_scan(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let mut library = Library::open(config.clone())?;
    let catalog = catalog_for(config)?;
    let reporter = CliReporter::new();

    reporter.start("Scanning");
    let result = library.scan(path, catalog.as_ref(), &reporter, &CancelToken::new());
    reporter.finish();
    let result = result.with_context(|| format!("scanning {}", path.display()))?;

    info!(
        "{} files visited, {} media found, {} new, {} duplicates",
        format!("{}", result.files_scanned).cyan(),
        format!("{}", result.media_found).cyan(),
        format!("{}", result.inserted).green(),
        format!("{}", result.duplicates).yellow(),
    );
    library.close()?;
    Ok(())
}

fn run_list(config: &AppConfig, selected: bool, subtitles: Option<bool>) -> anyhow::Result<()> {
    let library = Library::open_read_only(config.clone())?;
    let table = if selected {
        MediaTable::Selection
    } else {
        MediaTable::Library
    };

    let records = match subtitles {
        Some(has_subtitles) => library.list_by_subtitles(table, has_subtitles)?,
        None => library.list(table)?,
    };
    for record in &records {
        let subtitles = if record.has_subtitles {
            "subs".green()
        } else {
            "----".dimmed()
        };
        println!(
            "{:<24} {} {:<40} {:<6} {}",
            record.id,
            subtitles,
            record.title,
            record.year,
            record.path.dimmed()
        );
    }
    println!("{} media", format!("{}", records.len()).cyan());
    Ok(())
}

fn run_select(config: &AppConfig, select: SelectArgs) -> anyhow::Result<()> {
    let mut library = Library::open(config.clone())?;
    let staged = if select.all {
        library.select_all()?
    } else {
        library.select(&select.ids)?
    };
    println!("{} media staged for download", format!("{}", staged).green());
    Ok(())
}

fn run_deselect(config: &AppConfig) -> anyhow::Result<()> {
    let mut library = Library::open(config.clone())?;
    library.cancel_selection()?;
    println!("Selection cleared");
    Ok(())
}

fn run_remove(config: &AppConfig, id: &str) -> anyhow::Result<()> {
    let mut library = Library::open(config.clone())?;
    match library.remove_media(id)? {
        0 => println!("No media with id {}", id.yellow()),
        _ => println!("Removed {}", id.green()),
    }
    Ok(())
}

fn run_download(config: &AppConfig, language: Option<&str>) -> anyhow::Result<()> {
    let mut library = Library::open(config.clone())?;
    let preference = library.subtitle_preference(language)?;
    let service = OpenSubtitlesClient::new()?;
    let reporter = CliReporter::new();

    info!("Downloading {} subtitles", preference.language_name);
    reporter.start("Subtitles");
    let report = library.download_subtitles(&service, &preference, &reporter, &CancelToken::new());
    reporter.finish();
    let report = report?;

    let state = match report.final_state {
        CycleState::LoggedOut => format!("{:?}", report.final_state).green(),
        _ => format!("{:?}", report.final_state).red(),
    };
    info!(
        "{}: {} searched, {} found, {} downloaded, {} failed batches",
        state,
        format!("{}", report.searched).cyan(),
        format!("{}", report.candidates).cyan(),
        format!("{}", report.downloaded_files).green(),
        format!("{}", report.failed_chunks).red(),
    );
    for title in &report.not_found {
        println!("  {} {}", "no subtitles:".yellow(), title);
    }
    library.close()?;
    Ok(())
}

fn run_clear(config: &AppConfig) -> anyhow::Result<()> {
    if !prompt_confirm("Delete every media in the library?")? {
        return Ok(());
    }
    let mut library = Library::open(config.clone())?;
    library.clear_library()?;
    println!("Library cleared");
    Ok(())
}

fn run_languages(config: &AppConfig) -> anyhow::Result<()> {
    let directory = LanguageDirectory::load(&config.languages_file)?;
    for name in directory.names() {
        if name == config.language {
            println!("{}", name.green());
        } else {
            println!("{}", name);
        }
    }
    Ok(())
}

/// Ask a yes/no question on stdin. An empty answer or end of input means no.
fn prompt_confirm(prompt: &str) -> io::Result<bool> {
    let stdin = io::stdin();
    loop {
        print!("{} (y/N): ", prompt);
        io::stdout().flush()?;

        let mut answer = String::new();
        if stdin.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "" | "n" | "no" => return Ok(false),
            _ => println!("Please answer y or n."),
        }
    }
}
