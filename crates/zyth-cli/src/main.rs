use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, anyhow};
use clap::Parser;
use zyth::{config::Config, errors::TranslateError};

/// Ahead-of-time translator from a statically-typable Python subset to Zig source.
#[derive(Debug, Parser)]
#[command(name = "zyth", version, about)]
struct Cli {
    /// Python source file to translate.
    input: PathBuf,

    /// Overwrite the output file if it already exists.
    #[arg(long)]
    force: bool,

    /// Name of the translation algorithm/profile to use (reserved for future backends).
    #[arg(long, value_name = "NAME")]
    algorithm: Option<String>,

    /// Output path. Defaults to the input path with its extension replaced by `.zig`.
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Translate(err)) => {
            tracing::error!(%err, "translation failed");
            ExitCode::from(1)
        }
        Err(CliError::Io(err)) => {
            tracing::error!(%err, "i/o failure");
            ExitCode::from(2)
        }
    }
}

enum CliError {
    Translate(TranslateError),
    Io(anyhow::Error),
}

fn run(cli: &Cli) -> Result<(), CliError> {
    if let Some(algorithm) = &cli.algorithm {
        tracing::debug!(algorithm, "algorithm flag accepted but not yet used to select a backend");
    }

    let source = fs::read_to_string(&cli.input).with_context(|| format!("reading {}", cli.input.display())).map_err(CliError::Io)?;

    let output_path = cli.output.clone().unwrap_or_else(|| cli.input.with_extension("zig"));
    if output_path.exists() && !cli.force {
        return Err(CliError::Io(anyhow!("{} already exists; pass --force to overwrite", output_path.display())));
    }

    let config = Config::default();
    let translation = zyth::translate_source(&source, &cli.input.display().to_string(), &config).map_err(CliError::Translate)?;

    for diagnostic in &translation.diagnostics {
        tracing::warn!(%diagnostic, "translation recovery");
    }

    fs::write(&output_path, translation.source).with_context(|| format!("writing {}", output_path.display())).map_err(CliError::Io)?;
    Ok(())
}
