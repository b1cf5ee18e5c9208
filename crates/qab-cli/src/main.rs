//! CLI entry point for the qa-bridge tool.
//!
//! This binary subscribes to the `generated_tests` change feed and
//! materializes each delivered document as a test file under
//! `app/src/androidTest/java` in the target project.
//!
//! # Usage
//!
//! ```bash
//! qa-bridge [OPTIONS]
//!
//! # Bridge the default spool into ./app/src/androidTest/java
//! qa-bridge --project-root /path/to/project
//!
//! # Explicit credentials and a custom spool location
//! QA_BRIDGE_CREDENTIALS=/etc/qa/sa.json qa-bridge --spool /var/spool/qa
//! ```
//!
//! The process runs until interrupted; Ctrl+C (or SIGTERM on Unix)
//! unsubscribes from the feed and exits with status 0. Startup failures -
//! bad paths, unusable explicit credentials - exit non-zero.

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use qab_core::BridgeConfig;
use qab_feed::{AuthContext, ChangeFeed, CredentialMode, FeedSubscription, SpoolFeed};
use qab_sink::{DispatchReport, Dispatcher, Materializer};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Bridges a document change feed into androidTest source files.
///
/// Listens for new documents on the configured collection and writes each
/// `{pkg, file, code}` payload to the package-derived path under the test
/// source root. Files are replaced idempotently; nothing is ever deleted.
#[derive(Parser)]
#[command(name = "qa-bridge", version, about, long_about = None)]
struct Cli {
    /// Path to the Android project root.
    ///
    /// Defaults to the current directory if not specified.
    #[arg(short, long, env = "QA_BRIDGE_PROJECT_ROOT")]
    project_root: Option<Utf8PathBuf>,

    /// Spool directory delivering the change feed.
    ///
    /// Relative paths are resolved against the project root. Defaults to
    /// `qa-spool` if not specified.
    #[arg(long, env = "QA_BRIDGE_SPOOL")]
    spool: Option<Utf8PathBuf>,

    /// Collection to subscribe to.
    ///
    /// Defaults to `generated_tests` if not specified.
    #[arg(long, env = "QA_BRIDGE_COLLECTION")]
    collection: Option<String>,

    /// Test source directory, relative to the project root.
    ///
    /// Defaults to `app/src/androidTest/java` if not specified.
    #[arg(long, env = "QA_BRIDGE_TEST_DIR")]
    test_dir: Option<Utf8PathBuf>,

    /// Path to an explicit credential file.
    ///
    /// When absent, ambient discovery is used.
    #[arg(long, env = "QA_BRIDGE_CREDENTIALS")]
    credentials: Option<Utf8PathBuf>,

    /// Debounce window for the spool watcher, in milliseconds.
    #[arg(long, env = "QA_BRIDGE_DEBOUNCE_MS")]
    debounce_ms: Option<u64>,

    /// Enable verbose logging (debug level).
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// Noisy crates like `notify` are filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,mio=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds a [`BridgeConfig`] from CLI arguments.
///
/// Validates that the project root and the spool directory exist.
///
/// # Errors
///
/// Returns an error if either path is missing or not a directory.
fn build_config(cli: &Cli) -> color_eyre::Result<BridgeConfig> {
    let project_root = cli
        .project_root
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from("."));

    validate_dir(&project_root, "project root")?;

    let mut config = BridgeConfig::default();
    config.output.project_root = project_root;

    if let Some(test_dir) = &cli.test_dir {
        config.output.test_dir = test_dir.clone();
    }
    if let Some(collection) = &cli.collection {
        config.feed.collection.clone_from(collection);
    }
    if let Some(spool) = &cli.spool {
        config.feed.spool_dir = spool.clone();
    }
    if let Some(debounce_ms) = cli.debounce_ms {
        config.feed.debounce_ms = debounce_ms;
    }

    // The feed subscribes to the spool at startup; catch a bad path early
    validate_dir(&config.spool_path(), "spool")?;

    Ok(config)
}

fn validate_dir(path: &Utf8PathBuf, label: &str) -> color_eyre::Result<()> {
    if !path.exists() {
        return Err(color_eyre::eyre::eyre!(
            "{label} directory does not exist: {path}"
        ));
    }

    if !path.is_dir() {
        return Err(color_eyre::eyre::eyre!(
            "{label} path is not a directory: {path}"
        ));
    }

    Ok(())
}

// =============================================================================
// SUPERVISOR
// =============================================================================

/// Runs the bridge until cancelled.
///
/// Resolves credentials, subscribes to the feed, and processes batches until
/// the operator interrupts the process.
///
/// # Errors
///
/// Returns an error on startup failure or if the feed ends on its own.
async fn run_bridge(config: BridgeConfig, credentials: Option<Utf8PathBuf>) -> color_eyre::Result<()> {
    // Credential failures are fatal before anything subscribes
    let auth = CredentialMode::discover(credentials).resolve()?;

    print_banner(&config, &auth);

    let materializer = Materializer::new(config.output.output_root());
    let dispatcher =
        Dispatcher::new(materializer).with_display_base(config.output.project_root.clone());

    let feed = SpoolFeed::new(config.spool_path(), config.feed.debounce_ms);
    let subscription = feed.subscribe(&config.feed.collection).await?;

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    info!(
        collection = %config.feed.collection,
        "bridge running; press Ctrl+C to stop"
    );

    run_loop(subscription, &dispatcher, cancel).await?;

    print_shutdown_notice();
    Ok(())
}

/// Processes batches until cancellation, then unsubscribes.
///
/// The feed ending without a cancellation request is an error: the bridge
/// promises to stay subscribed until the operator stops it.
async fn run_loop(
    mut subscription: FeedSubscription,
    dispatcher: &Dispatcher,
    cancel: CancellationToken,
) -> color_eyre::Result<()> {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            batch = subscription.recv() => match batch {
                Some(batch) => {
                    let outcomes = dispatcher.dispatch(&batch);
                    let report = DispatchReport::from_outcomes(&outcomes);
                    info!(events = batch.len(), %report, "processed change batch");
                }
                None => {
                    return Err(color_eyre::eyre::eyre!(
                        "change feed ended unexpectedly"
                    ));
                }
            }
        }
    }

    subscription.unsubscribe().await?;
    Ok(())
}

/// Cancels the token on the first interrupt signal.
///
/// Ctrl+C everywhere; SIGTERM additionally on Unix.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
                        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                    }
                }
                Err(error) => {
                    tracing::warn!(error = %error, "failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    info!("received Ctrl+C, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl+C, shutting down");
        }

        cancel.cancel();
    });
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints the startup banner.
fn print_banner(config: &BridgeConfig, auth: &AuthContext) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle, "{}", "=".repeat(60));
    let _ = writeln!(handle, "  Magic QA Bridge - change feed -> androidTest");
    let _ = writeln!(handle, "{}", "=".repeat(60));
    let _ = writeln!(handle, "  Project root : {}", config.output.project_root);
    let _ = writeln!(handle, "  Test output  : {}", config.output.output_root());
    let _ = writeln!(handle, "  Spool        : {}", config.spool_path());
    let _ = writeln!(handle, "  Collection   : {}", config.feed.collection);
    let _ = writeln!(handle, "  Credentials  : {}", auth.mode_label());
    if let Some(project_id) = auth.project_id() {
        let _ = writeln!(handle, "  Project id   : {project_id}");
    }
    let _ = writeln!(handle);
}

/// Prints the shutdown notice after a clean unsubscribe.
fn print_shutdown_notice() {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let _ = writeln!(handle, "Bridge stopped.");
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Validate configuration and run until interrupted
    let config = build_config(&cli)?;
    run_bridge(config, cli.credentials).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use qab_core::Document;
    use qab_feed::{ChangeBatch, ChangeEvent, MemoryFeed};
    use tempfile::TempDir;

    fn temp_dispatcher() -> (TempDir, Dispatcher) {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
        (dir, Dispatcher::new(Materializer::new(root)))
    }

    #[tokio::test]
    async fn test_run_loop_exits_cleanly_on_cancellation() {
        let (_guard, dispatcher) = temp_dispatcher();
        let feed = MemoryFeed::new();
        let subscription = feed.subscribe("generated_tests").await.expect("subscribe");

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run_loop(subscription, &dispatcher, cancel).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_loop_processes_batches_until_cancelled() {
        let (guard, dispatcher) = temp_dispatcher();
        let feed = MemoryFeed::new();
        let subscription = feed.subscribe("generated_tests").await.expect("subscribe");

        let doc = Document::new("doc-1")
            .with_field("pkg", "com.example")
            .with_field("file", "T.java")
            .with_field("code", "class T {}");
        feed.push(ChangeBatch::from_events([ChangeEvent::added(doc)]))
            .await;

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run_loop(subscription, &dispatcher, loop_cancel).await
        });

        // Give the loop a moment to drain the batch, then stop it
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.expect("join").expect("clean shutdown");

        let written = guard.path().join("com/example/T.java");
        assert!(written.exists(), "batch processed before cancellation");
    }

    #[tokio::test]
    async fn test_run_loop_errors_when_feed_ends() {
        let (_guard, dispatcher) = temp_dispatcher();
        let feed = MemoryFeed::new();
        let subscription = feed.subscribe("generated_tests").await.expect("subscribe");

        // Dropping the feed closes the delivery channel
        drop(feed);

        let result = run_loop(subscription, &dispatcher, CancellationToken::new()).await;
        assert!(result.is_err());
    }
}
