use clap::Parser;
use env_logger::Env;

use tech_events_lib::cli::Cli;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = tech_events_lib::run(cli) {
        log::error!("Fatal error: {err:#}");
        std::process::exit(1);
    }
}
