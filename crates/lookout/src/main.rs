//! Lookout - debug sidecar for a running service
//!
//! # Usage
//!
//! ```bash
//! # Run the server (default)
//! lookout
//! lookout --port 19000 --git-dir /srv/app
//! lookout --config lookout.toml
//!
//! # Check a configuration file
//! lookout config --config lookout.toml
//! ```

mod cmd;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lookout_config::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Lookout - live log tails and debug routes over HTTP
#[derive(Parser, Debug)]
#[command(name = "lookout")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Server options when no subcommand is given
    #[command(flatten)]
    serve: cmd::serve::ServeArgs,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server
    Serve(cmd::serve::ServeArgs),

    /// Validate configuration and print the tailed logs
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(args)) => {
            let (level, format) = resolve_logging(cli.log_level.as_deref(), cli.config.as_deref());
            init_logging(&level, format)?;
            cmd::serve::run(args, cli.config).await
        }
        Some(Command::Config) => {
            // Prints to stdout, no logging
            cmd::config::run(cli.config)
        }
        // No subcommand = run server (default behavior)
        None => {
            let (level, format) = resolve_logging(cli.log_level.as_deref(), cli.config.as_deref());
            init_logging(&level, format)?;
            cmd::serve::run(cli.serve, cli.config).await
        }
    }
}

/// Resolve log level and format: CLI flag > config file > default "info"
fn resolve_logging(cli_level: Option<&str>, config_path: Option<&Path>) -> (String, LogFormat) {
    let config = config_path
        .filter(|path| path.exists())
        .and_then(|path| Config::from_file(path).ok());

    let format = config
        .as_ref()
        .map(|config| config.log.format)
        .unwrap_or_default();

    // CLI flag takes precedence
    if let Some(level) = cli_level {
        return (level.to_string(), format);
    }

    match config {
        Some(config) => (config.log.level.as_str().to_string(), format),
        None => ("info".to_string(), format),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with((!json).then(|| fmt::layer().with_target(true).with_thread_ids(false)))
        .with(json.then(|| fmt::layer().json().with_current_span(false)))
        .with(filter)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_accepts_server_flags() {
        let cli = Cli::try_parse_from(["lookout", "--port", "8080", "--git-dir", "/srv/app"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.port, Some(8080));
        assert_eq!(cli.serve.git_dir.as_deref(), Some(Path::new("/srv/app")));
    }

    #[test]
    fn test_serve_subcommand_with_global_config() {
        let cli = Cli::try_parse_from(["lookout", "serve", "--config", "x.toml", "-l", "debug"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Serve(_))));
        assert_eq!(cli.config.as_deref(), Some(Path::new("x.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::try_parse_from(["lookout", "config"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Config)));
    }

    #[test]
    fn test_resolve_logging_defaults() {
        let (level, format) = resolve_logging(None, None);
        assert_eq!(level, "info");
        assert_eq!(format, LogFormat::Console);
    }

    #[test]
    fn test_resolve_logging_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lookout.toml");
        std::fs::write(&path, "[log]\nlevel = \"warn\"\nformat = \"json\"\n").unwrap();

        let (level, format) = resolve_logging(None, Some(&path));
        assert_eq!(level, "warn");
        assert_eq!(format, LogFormat::Json);

        let (level, _) = resolve_logging(Some("trace"), Some(&path));
        assert_eq!(level, "trace");
    }
}
