use clap::Parser;

/// Tether: drive a main window and its child windows headlessly and
/// exercise the script call bridge.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (trace, debug, info, warn, error, or a full
    /// filter directive).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Page loaded in the main window, overriding `window.url`.
    #[arg(long)]
    pub url: Option<String>,

    /// Page loaded in popup windows.
    #[arg(long, default_value = "http://localhost:3030/child.html")]
    pub child_url: String,

    /// How many times each popup rebinds its counter.
    #[arg(long, default_value_t = 3)]
    pub ticks: u32,

    /// Milliseconds between counter rebinds.
    #[arg(long, default_value_t = 200)]
    pub tick_ms: u64,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["tether"]);
        assert!(args.config.is_none());
        assert!(!args.print_config);
        assert_eq!(args.child_url, "http://localhost:3030/child.html");
        assert_eq!(args.ticks, 3);
        assert_eq!(args.tick_ms, 200);
    }

    #[test]
    fn overrides() {
        let args = Args::parse_from([
            "tether",
            "--config",
            "/tmp/tether.toml",
            "--log-level",
            "debug",
            "--ticks",
            "5",
            "--print-config",
        ]);
        assert_eq!(args.config.as_deref(), Some("/tmp/tether.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.ticks, 5);
        assert!(args.print_config);
    }
}
