//! CLI argument definitions using clap derive

use crate::http::Method;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shellcache - offline application shell cache
///
/// Pre-caches a fixed set of shell assets into a versioned bucket, retires
/// stale buckets on activation and answers requests cache-first.
#[derive(Parser, Debug)]
#[command(name = "shellcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SHELLCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// State directory (registration, buckets, audit log)
    #[arg(long, global = true, env = "SHELLCACHE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a new generation and pre-cache the shell assets
    Install,

    /// Activate the waiting generation and retire stale buckets
    Activate,

    /// Install then activate in one step
    Update,

    /// Resolve a request through the active generation
    Fetch(FetchArgs),

    /// Show generations and buckets
    Status,

    /// Inspect or remove cache buckets
    Buckets(BucketsArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Absolute URL, or a path resolved against the configured origin
    pub url: String,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: Method,

    /// Request header (K: V), repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Print status line and headers before the body
    #[arg(short, long)]
    pub include: bool,
}

/// Arguments for the buckets command
#[derive(Parser, Debug)]
pub struct BucketsArgs {
    /// Subcommand for buckets
    #[command(subcommand)]
    pub action: BucketsAction,
}

/// Buckets subcommands
#[derive(Subcommand, Debug)]
pub enum BucketsAction {
    /// List buckets with entry counts
    List,

    /// Show the entries of a bucket
    Show {
        /// Bucket name
        name: String,
    },

    /// Delete a bucket
    Delete {
        /// Bucket name
        name: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Parse a request header in `Name: value` format
fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid header format: no ':' found in '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header format: empty name in '{s}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_header_valid() {
        let (k, v) = parse_header("Accept: text/html").unwrap();
        assert_eq!(k, "Accept");
        assert_eq!(v, "text/html");
    }

    #[test]
    fn parse_header_value_with_colon() {
        let (k, v) = parse_header("Referer: http://localhost:7860/").unwrap();
        assert_eq!(k, "Referer");
        assert_eq!(v, "http://localhost:7860/");
    }

    #[test]
    fn parse_header_invalid() {
        assert!(parse_header("Accept").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn cli_parses_install() {
        let cli = Cli::parse_from(["shellcache", "install"]);
        assert!(matches!(cli.command, Commands::Install));
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "shellcache",
            "status",
            "-vv",
            "--log-format",
            "json",
            "--state-dir",
            "/tmp/shellcache",
        ]);
        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/shellcache")));
    }

    #[test]
    fn cli_parses_fetch() {
        let cli = Cli::parse_from([
            "shellcache",
            "fetch",
            "/index.html",
            "-X",
            "head",
            "-H",
            "Accept: text/html",
            "-i",
        ]);
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.url, "/index.html");
                assert_eq!(args.method, Method::Head);
                assert_eq!(
                    args.headers,
                    vec![("Accept".to_string(), "text/html".to_string())]
                );
                assert!(args.include);
            }
            _ => panic!("expected Fetch command"),
        }
    }

    #[test]
    fn cli_fetch_defaults_to_get() {
        let cli = Cli::parse_from(["shellcache", "fetch", "/"]);
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.method, Method::Get);
                assert!(args.headers.is_empty());
                assert!(!args.include);
            }
            _ => panic!("expected Fetch command"),
        }
    }

    #[test]
    fn cli_parses_buckets_delete() {
        let cli = Cli::parse_from(["shellcache", "buckets", "delete", "old-v0", "--yes"]);
        match cli.command {
            Commands::Buckets(BucketsArgs {
                action: BucketsAction::Delete { name, yes },
            }) => {
                assert_eq!(name, "old-v0");
                assert!(yes);
            }
            _ => panic!("expected Buckets Delete command"),
        }
    }

    #[test]
    fn cli_parses_config_init() {
        let cli = Cli::parse_from(["shellcache", "config", "init", "--force"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Init { force }),
            }) => assert!(force),
            _ => panic!("expected Config Init command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_method() {
        assert!(Cli::try_parse_from(["shellcache", "fetch", "/", "-X", "BREW"]).is_err());
    }
}
