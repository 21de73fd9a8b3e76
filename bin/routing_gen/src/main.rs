use clap::Parser;
use log::info;
use pxmcmc_rs::config::load_config;
use std::{error::Error, path::PathBuf};

mod summary;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input config file path.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Output path of the summary; printed to stdout when absent.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rebuild the routing matrix and wavelet basis without reading or
    /// writing the cache directory.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let args = Args::parse();
    info!("Config path: {:?}", args.config);
    info!("Output path: {:?}", args.output);
    info!("Use cache: {:?}", !args.no_cache);

    let config = load_config(&args.config)?;
    let base = args
        .config
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();

    let summary = summary::summarize(&config, &base, !args.no_cache)?;
    let text = toml::to_string(&summary)?;
    match &args.output {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{text}"),
    }

    Ok(())
}
