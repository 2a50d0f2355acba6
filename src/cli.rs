use std::path::PathBuf;

use clap::Parser;

/// Scrape London tech events from Eventbrite and Meetup.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "tech-events")]
#[command(version)]
pub struct Cli {
    /// Number of listing pages to scrape
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: Option<u32>,

    /// Configuration file (JSON)
    #[arg(long, env = "EVENTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Also write the scraped events to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append to the output file instead of replacing it
    #[arg(long, requires = "output")]
    pub append: bool,

    /// Print stored events as JSON and exit
    #[arg(long, conflicts_with_all = ["sources", "init_config"])]
    pub list: bool,

    /// Print the configured sources and exit
    #[arg(long, conflicts_with = "init_config")]
    pub sources: bool,

    /// Scrape only the source with this id
    #[arg(long, value_name = "ID")]
    pub source: Option<String>,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    pub init_config: bool,
}
