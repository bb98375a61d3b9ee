use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use tracing::{debug, info};

use pr_changes::{
    Args, Config, ReviewUnit,
    core::{
        ExitCode,
        output::{ChangesReport, OutputFormatter, OutputWriter},
    },
    error::PrChangesError,
    git::{DiffOptions, load_review_unit},
    logging::{LogConfig, init_logging},
    models::InputSource,
};

fn main() -> std::process::ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            ExitCode::for_error(&error).into()
        }
    }
}

fn run(args: &Args) -> Result<()> {
    // Handle --create-config flag
    if args.create_config {
        let path = Config::create_sample_config()?;
        println!("Sample configuration written to {}", path.display());
        return Ok(());
    }

    // Resolve configuration from CLI args, environment variables, and config file
    let settings = args.resolve_config()?;
    let _log_guard = init_logging(&LogConfig::from_settings(&settings))?;
    debug!(?settings, "Resolved configuration");

    let unit = match args.input_source()? {
        InputSource::Json(path) => ReviewUnit::load(&path)?,
        InputSource::Git { repo, base, head } => {
            let options = DiffOptions::from_settings(&settings);
            load_review_unit(&repo, &base, &head, &options)
                .map_err(PrChangesError::from)
                .with_context(|| format!("Failed to load review unit from {}", repo.display()))?
        }
    };
    info!(
        merge_base = %unit.merge_base,
        head = %unit.head,
        commits = unit.commits.len(),
        "Loaded review unit"
    );

    let provider = unit.build()?;
    let report = ChangesReport::from_provider(&provider);

    let stdout = io::stdout();
    let mut writer = OutputWriter::new(stdout.lock(), *settings.output.value());
    writer.write_report(&report)?;
    writer.flush()?;
    Ok(())
}
