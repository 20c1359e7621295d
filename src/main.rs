use clap::Parser;
use postsmith::build::build_site;
use postsmith::config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Builds the blog in the current project.
#[derive(Parser)]
#[command(name = "postsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long)]
    directory: Option<PathBuf>,

    /// Path to a project file, overriding the search for `postsmith.yaml`
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

// A valid RUST_LOG wins over `-v`, in either direction.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_project_file(path)?,
        None => {
            let directory = match &cli.directory {
                Some(directory) => directory.clone(),
                None => std::env::current_dir()?,
            };
            Config::from_directory(&directory)?
        }
    };
    build_site(&config)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_log_filter_defaults() {
        assert_eq!(Some(LevelFilter::INFO), log_filter(false, None).max_level_hint());
        assert_eq!(Some(LevelFilter::DEBUG), log_filter(true, None).max_level_hint());
    }

    #[test]
    fn test_rust_log_can_lower_level() {
        assert_eq!(
            Some(LevelFilter::WARN),
            log_filter(false, Some("warn")).max_level_hint()
        );
        assert_eq!(
            Some(LevelFilter::ERROR),
            log_filter(true, Some("error")).max_level_hint()
        );
    }

    #[test]
    fn test_invalid_rust_log_falls_back() {
        assert_eq!(
            Some(LevelFilter::INFO),
            log_filter(false, Some("postsmith=verbose")).max_level_hint()
        );
    }
}
