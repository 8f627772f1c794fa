//! CLI argument definitions using clap derive macros.

use std::time::Duration;

use clap::{Parser, Subcommand};
use species_gateway::{pokeapi, translation, DEFAULT_MAX_RETRIES};

/// HTTP gateway serving species descriptions and their fun translations.
#[derive(Parser, Debug)]
#[command(name = "species-gateway")]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 5555)]
    pub port: u16,

    /// Log level: 0 none, 1 error, 2 warn, 3 info, 4 debug (RUST_LOG wins when set)
    #[arg(short, long, default_value_t = 1)]
    pub log_level: u8,

    /// funtranslations API secret; empty uses the free plan
    #[arg(long, env = "TRANSLATION_API_KEY", default_value = "", hide_env_values = true)]
    pub translation_api_key: String,

    /// PokéAPI base URL
    #[arg(long, env = "POKEAPI_ENDPOINT", default_value = pokeapi::DEFAULT_ENDPOINT)]
    pub pokeapi_endpoint: String,

    /// funtranslations base URL
    #[arg(long, env = "TRANSLATION_ENDPOINT", default_value = translation::DEFAULT_ENDPOINT)]
    pub translation_endpoint: String,

    /// Retries after the first attempt of each upstream call
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Per-call timeout in milliseconds (0 disables it)
    #[arg(long, default_value_t = 0)]
    pub timeout_ms: u64,

    /// Initial retry delay in milliseconds (0 retries immediately)
    #[arg(long, default_value_t = 0)]
    pub backoff_initial_ms: u64,

    /// Ceiling for exponential retry delays in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub backoff_max_ms: u64,
}

impl ServeArgs {
    /// Directive for `tracing_subscriber::EnvFilter`.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level {
            0 => "off",
            1 => "error",
            2 => "warn",
            3 => "info",
            _ => "debug",
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve(args: &[&str]) -> ServeArgs {
        let argv = ["species-gateway", "serve"].iter().chain(args.iter());
        match Args::try_parse_from(argv).unwrap().command {
            Command::Serve(args) => args,
        }
    }

    #[test]
    fn test_cli_serve_defaults() {
        let args = serve(&[]);
        assert_eq!(args.port, 5555);
        assert_eq!(args.log_level, 1);
        assert_eq!(args.max_retries, 2);
        assert_eq!(args.timeout(), Duration::ZERO);
        assert_eq!(args.backoff_initial(), Duration::ZERO);
        assert_eq!(args.backoff_max(), Duration::from_secs(2));
    }

    #[test]
    fn test_cli_serve_flags_override_defaults() {
        let args = serve(&[
            "--port",
            "8080",
            "--log-level",
            "3",
            "--pokeapi-endpoint",
            "http://localhost:9000",
            "--max-retries",
            "5",
            "--timeout-ms",
            "1500",
        ]);
        assert_eq!(args.port, 8080);
        assert_eq!(args.log_filter(), "info");
        assert_eq!(args.pokeapi_endpoint, "http://localhost:9000");
        assert_eq!(args.max_retries, 5);
        assert_eq!(args.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_cli_log_level_clamps_to_debug() {
        assert_eq!(serve(&["--log-level", "0"]).log_filter(), "off");
        assert_eq!(serve(&["--log-level", "1"]).log_filter(), "error");
        assert_eq!(serve(&["--log-level", "2"]).log_filter(), "warn");
        assert_eq!(serve(&["--log-level", "4"]).log_filter(), "debug");
        assert_eq!(serve(&["--log-level", "9"]).log_filter(), "debug");
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Args::try_parse_from(["species-gateway"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["species-gateway", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
