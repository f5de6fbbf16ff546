use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "subcrawl")]
#[command(about = "Find your movies and fetch their subtitles", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory tree for media and add it to the library
    Scan {
        /// Root directory to scan
        path: PathBuf,
    },
    /// List the library, or the staged selection
    List {
        #[arg(long)]
        selected: bool,
        /// Only media with subtitle files next to them
        #[arg(long, conflicts_with = "without_subs")]
        with_subs: bool,
        /// Only media without subtitle files next to them
        #[arg(long)]
        without_subs: bool,
    },
    /// Stage media for subtitle download
    Select(SelectArgs),
    /// Clear the staged selection
    Deselect,
    /// Remove one media from the library
    Remove {
        id: String,
    },
    /// Search and download subtitles for the staged selection
    Download {
        /// Subtitle language by English name, overriding the configured one
        #[arg(long)]
        language: Option<String>,
    },
    /// Delete every media in the library
    Clear,
    /// List the subtitle languages that can be chosen
    Languages,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Ids of the media to stage
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub ids: Vec<String>,
    /// Stage every media in the library
    #[arg(long)]
    pub all: bool,
}
