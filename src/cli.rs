// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nvidia-proxy",
    version,
    about = "Streaming proxy for the NVIDIA chat-completions API with round-robin key rotation",
    long_about = "Forwards chat-completion requests to the NVIDIA inference API, rotating through the configured API keys and streaming the upstream response back unchanged."
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Server bind address (overrides the configuration file)
    #[arg(long, env = "NVIDIA_PROXY_HOST")]
    pub host: Option<String>,

    /// Server port (overrides the configuration file and PORT)
    #[arg(short, long, env = "NVIDIA_PROXY_PORT")]
    pub port: Option<u16>,

    /// Emit logs as JSON
    #[arg(long, env = "NVIDIA_PROXY_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the proxy server (default)
    Serve,

    /// Load and validate the configuration, then exit
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Subcommand to run, `serve` when none was given.
    pub fn selected_command(&self) -> Commands {
        match self.command {
            Some(Commands::CheckConfig) => Commands::CheckConfig,
            Some(Commands::Serve) | None => Commands::Serve,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::try_parse_from(["nvidia-proxy"]).unwrap();
        assert_eq!(cli.selected_command(), Commands::Serve);
    }

    #[test]
    fn test_parses_overrides_and_subcommand() {
        let cli = Cli::try_parse_from([
            "nvidia-proxy",
            "--config",
            "/etc/proxy.yaml",
            "--host",
            "127.0.0.1",
            "-p",
            "9000",
            "check-config",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/proxy.yaml")));
        assert_eq!(cli.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.selected_command(), Commands::CheckConfig);
    }
}
