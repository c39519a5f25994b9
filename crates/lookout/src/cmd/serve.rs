//! Serve command
//!
//! Spawns one tail point per configured log, builds the debug router and
//! serves it until SIGINT/SIGTERM. Shutdown cancels the tail points first so
//! open log streams end and the HTTP server can drain.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use lookout_api::{AppState, RevisionSource, build_router};
use lookout_config::{Config, TailConfig};
use lookout_revision::{CachedRevisionProvider, GitRevisionProvider};
use lookout_tail::{TailOptions, TailRegistry};

/// Time allowed for tail tasks to stop after the server drained
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve command arguments
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Port to listen on (the PORT environment variable takes precedence)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the git repository reported in X-Git-Repository
    /// (empty means the configured default)
    #[arg(long)]
    pub git_dir: Option<PathBuf>,
}

/// Run the serve command
pub async fn run(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(default)".to_string()),
        "Lookout starting"
    );

    let mut config = super::load_config(config_path.as_deref())?;
    configure(&mut config, &args, |key| std::env::var(key).ok())
        .context("invalid environment override")?;

    if let Err(e) = run_server(config).await {
        error!(error = %e, "server error");
        return Err(e);
    }

    info!("Lookout shutdown complete");
    Ok(())
}

/// Layer flags and environment over the config file.
///
/// `PORT` beats `--port`; `--git-dir` beats `LOOKOUT_GIT_REPOSITORY`.
fn configure<F>(config: &mut Config, args: &ServeArgs, lookup: F) -> lookout_config::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = args.port {
        config.server.port = port;
    }

    config.apply_env_with(lookup)?;

    if let Some(dir) = &args.git_dir
        && !dir.as_os_str().is_empty()
    {
        config.revision.repository = dir.clone();
    }
    Ok(())
}

/// Tail point tuning from the `[tail]` section
fn tail_options(config: &TailConfig) -> TailOptions {
    TailOptions {
        poll_interval: config.poll_interval,
        queue_capacity: config.queue_capacity,
        max_subscribers: config.max_subscribers,
        max_chunk_bytes: config.max_chunk_bytes,
    }
}

/// Build the revision header source, if enabled
fn revision_source(config: &Config) -> Option<RevisionSource> {
    let revision = &config.revision;
    if !revision.enabled {
        info!("revision header disabled");
        return None;
    }

    let git = GitRevisionProvider::new().with_timeout(revision.timeout);
    let provider = CachedRevisionProvider::new(git, revision.cache_ttl);
    Some(RevisionSource::new(
        Arc::new(provider),
        revision.repository_path(),
        revision.timeout,
    ))
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    // Create cancellation token for coordinated shutdown
    let cancel = CancellationToken::new();

    let logs = config
        .logs
        .iter()
        .map(|(name, log)| (name.to_string(), log.resolved_path()))
        .collect::<Vec<_>>();
    for (name, path) in &logs {
        if !path.exists() {
            warn!(log = %name, path = %path.display(), "log file does not exist yet, waiting for it");
        }
    }

    let tails = Arc::new(TailRegistry::spawn(logs, tail_options(&config.tail), &cancel));

    let mut state = AppState::new(Arc::clone(&tails));
    if let Some(source) = revision_source(&config) {
        info!(repo = %source.repository().display(), "revision header enabled");
        state = state.with_revision(source);
    }

    let mut app = build_router(state);
    if config.server.trace_requests {
        app = app.layer(TraceLayer::new_for_http());
    }

    // Bind
    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, logs = ?config.log_names(), "Lookout listening");

    let server = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    cancel.cancelled().await;
                })
                .await
        })
    };

    // Wait for shutdown signal
    tokio::select! {
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, stopping server...");
        }
        _ = cancel.cancelled() => {}
    }
    cancel.cancel();

    // Cancelling ended every stream, so the server can drain
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e).context("HTTP server failed"),
        Err(e) => return Err(e).context("HTTP server task panicked"),
    }

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, tails.join())
        .await
        .is_err()
    {
        warn!("tail tasks did not finish within timeout, continuing shutdown");
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        let args = ServeArgs {
            port: Some(8080),
            git_dir: Some(PathBuf::from("/srv/app")),
        };

        configure(&mut config, &args, no_env).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.revision.repository, Path::new("/srv/app"));
    }

    #[test]
    fn test_empty_git_dir_keeps_default() {
        let mut config = Config::default();
        let args = ServeArgs {
            port: None,
            git_dir: Some(PathBuf::new()),
        };

        configure(&mut config, &args, no_env).unwrap();
        assert_eq!(config.revision.repository, Path::new("."));
        assert_eq!(config.server.port, lookout_config::DEFAULT_PORT);
    }

    #[test]
    fn test_port_env_beats_flag() {
        let mut config = Config::default();
        let args = ServeArgs {
            port: Some(8080),
            git_dir: None,
        };

        configure(&mut config, &args, env(&[("PORT", "9000")])).unwrap();
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_git_dir_flag_beats_env() {
        let mut config = Config::default();
        let vars = env(&[("LOOKOUT_GIT_REPOSITORY", "/from/env")]);

        configure(&mut config, &ServeArgs::default(), &vars).unwrap();
        assert_eq!(config.revision.repository, Path::new("/from/env"));

        let args = ServeArgs {
            port: None,
            git_dir: Some(PathBuf::from("/from/flag")),
        };
        configure(&mut config, &args, &vars).unwrap();
        assert_eq!(config.revision.repository, Path::new("/from/flag"));
    }

    #[test]
    fn test_bad_port_env_is_error() {
        let mut config = Config::default();
        let result = configure(&mut config, &ServeArgs::default(), env(&[("PORT", "http")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_tail_options_from_config() {
        let config = Config::default();
        let options = tail_options(&config.tail);
        assert_eq!(options.poll_interval, config.tail.poll_interval);
        assert_eq!(options.max_subscribers, 100);
    }

    #[test]
    fn test_revision_source_disabled() {
        let mut config = Config::default();
        config.revision.enabled = false;
        assert!(revision_source(&config).is_none());
    }
}
