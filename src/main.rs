use anyhow::Result;
use clap::Parser;
use petconsole::{app, config, logging};

fn main() -> Result<()> {
    let cli = config::Cli::parse();
    let paths = config::project_paths()?;
    logging::init(&paths.log_path, cli.log_level)?;
    app::run(cli, paths)
}
