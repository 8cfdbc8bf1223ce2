mod cli;
mod demo;

use std::path::Path;
use std::time::Duration;

use tether_common::ConfigError;
use tether_config::TetherConfig;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVE: &str = "tether=info";

fn load_config(path: Option<&str>) -> Result<TetherConfig, ConfigError> {
    match path {
        Some(path) => tether_config::load_config_from(Path::new(path)),
        None => tether_config::load_config(),
    }
}

/// `--log-level` wins, then the config's level, then the default.
fn log_directive(cli_level: Option<&str>, config: Option<&TetherConfig>) -> String {
    match (cli_level, config) {
        (Some(level), _) => level.to_string(),
        (None, Some(config)) => format!("tether={}", config.logging.level.as_str()),
        (None, None) => DEFAULT_LOG_DIRECTIVE.to_string(),
    }
}

fn init_logging(directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| DEFAULT_LOG_DIRECTIVE.parse().unwrap()),
            ),
        )
        .init();
}

fn main() {
    let args = cli::parse();

    // Config first: it may set the log level.
    let loaded = load_config(args.config.as_deref());
    init_logging(&log_directive(args.log_level.as_deref(), loaded.as_ref().ok()));

    tracing::info!("Tether v{} starting...", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        TetherConfig::default()
    });
    if let Some(url) = args.url {
        config.window.url = url;
    }

    if args.print_config {
        println!("{}", tether_config::config_to_json(&config));
        return;
    }

    let options = demo::DemoOptions {
        child_url: args.child_url,
        ticks: args.ticks,
        tick_interval: Duration::from_millis(args.tick_ms),
    };
    if let Err(e) = demo::run(config, options) {
        tracing::error!("Run failed: {e}");
        std::process::exit(1);
    }
    tracing::info!("Shutdown complete");
}
