//! @ai:module:intent CLI entry point for the guardmark annotation engine
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on engine, config, job, output

use clap::{Parser, ValueEnum};
use guardmark_engine::{output, Engine, EngineConfig, FilePair, OutputFormat, RunPlan};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "guardmark")]
#[command(
    author,
    version,
    about = "Guard annotated C functions with #ifdef and generate annotation metadata"
)]
struct Cli {
    /// Header declaring annotation extensions (`// #annotation @Name(args) : @When(SYMBOL)`)
    extensions: PathBuf,

    /// Output path for the generated declarations header
    out_declarations: PathBuf,

    /// Output path for the generated data source
    out_data: PathBuf,

    /// Files to transform as INPUT:OUTPUT; a directory input is processed recursively
    #[arg(required = true, value_name = "INPUT:OUTPUT")]
    pairs: Vec<FilePair>,

    /// Engine configuration file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Also write the annotation table as a JSON manifest
    #[arg(long, short)]
    manifest: Option<PathBuf>,

    /// Print a summary of the run in this format
    #[arg(long, short, value_enum)]
    format: Option<Format>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

/// @ai:intent Build the log filter: RUST_LOG when set, otherwise a level per `-v`
/// @ai:post an explicit `-v` raises the crate targets on top of RUST_LOG
fn log_filter(verbose: u8, env: Option<&str>) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let defaults = format!("guardmark={},guardmark_engine={}", level, level);

    match env.map(str::trim).filter(|e| !e.is_empty()) {
        Some(env) if verbose == 0 => EnvFilter::new(env),
        Some(env) => EnvFilter::new(format!("{},{}", env, defaults)),
        None => EnvFilter::new(defaults),
    }
}

fn init_tracing(verbose: u8) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, env.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(1);
            }
        },
        None => EngineConfig::default(),
    };

    let plan = RunPlan {
        extensions: cli.extensions,
        declarations: cli.out_declarations,
        data: cli.out_data,
        pairs: cli.pairs,
        manifest: cli.manifest,
    };

    let mut engine = Engine::new(config);
    match engine.run(&plan) {
        Ok(summary) => {
            if let Some(format) = cli.format {
                println!("{}", output::format_run_summary(&summary, format.into()));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_rust_log_is_honored_without_verbose() {
        let filter = log_filter(0, Some("guardmark_engine=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_verbose_sets_crate_level() {
        assert_eq!(log_filter(0, None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(log_filter(1, None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(2, Some("  ")).max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_pairs_parse_from_command_line() {
        let cli = Cli::try_parse_from([
            "guardmark",
            "base.h",
            "out.h",
            "out.c",
            "a.c:build/a.c",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.pairs, vec![FilePair::new("a.c", "build/a.c")]);
        assert_eq!(cli.verbose, 2);
        assert!(Cli::try_parse_from(["guardmark", "base.h", "out.h", "out.c"]).is_err());
    }
}
