// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - hosted chat front-end with a streaming agent relay.
//!
//! This is the binary entry point.

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_config::{ConfigError, ParleyConfig};

/// Parley - streaming agent relay and file store.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Load this TOML file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway (default).
    Serve,
    /// Validate configuration and print the effective settings.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("parley: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => print!("{}", config_summary(&config)),
    }
}

fn load(path: Option<&std::path::Path>) -> Result<ParleyConfig, Vec<ConfigError>> {
    match path {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    }
}

/// Human-readable effective configuration. The API key is never printed.
fn config_summary(config: &ParleyConfig) -> String {
    let mode = if config.relay.mock_mode { "mock" } else { "live" };
    let api_key = if config.agent.api_key.is_some() {
        "set"
    } else {
        "unset"
    };
    format!(
        "config ok\n\
         server:  {}:{} (log level {})\n\
         relay:   {mode} mode, origin `{}`, agent {}\n\
         agent:   {} (api key {api_key}, timeout {}s, {} retries)\n\
         storage: {} (chunk size {}, max upload {} bytes)\n",
        config.server.host,
        config.server.port,
        config.server.log_level,
        config.relay.origin_application,
        config.relay.agent_id.as_deref().unwrap_or("default"),
        if config.agent.base_url.is_empty() {
            "<no base url>"
        } else {
            config.agent.base_url.as_str()
        },
        config.agent.timeout_secs,
        config.agent.max_retries,
        config.storage.database_path,
        config.storage.chunk_size,
        config.storage.max_upload_bytes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["parley"]).unwrap();
        assert!(cli.command.is_none());
        let cli = Cli::try_parse_from(["parley", "check-config", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn mock_mode_defaults_validate() {
        let config = parley_config::load_and_validate_str("[relay]\nmock_mode = true\n")
            .expect("mock-mode defaults should be valid");
        assert_eq!(config.server.port, 8080);
        let summary = config_summary(&config);
        assert!(summary.contains("mock mode"));
        assert!(summary.contains("api key unset"));
    }

    #[test]
    fn summary_hides_api_key() {
        let config = parley_config::load_and_validate_str(
            "[agent]\nbase_url = \"https://agents.example.com\"\napi_key = \"sk-secret\"\n",
        )
        .unwrap();
        let summary = config_summary(&config);
        assert!(summary.contains("live mode"));
        assert!(!summary.contains("sk-secret"));
    }

    #[test]
    fn config_file_is_loaded_from_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parley.toml");
        std::fs::write(&path, "[relay]\nmock_mode = true\n[server]\nport = 9191\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9191);
    }
}
