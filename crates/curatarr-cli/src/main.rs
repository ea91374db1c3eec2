// SPDX-License-Identifier: GPL-3.0-or-later
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::serve;
use clap::Parser;
use curatarr_api::router;
use curatarr_application::AppState;
use curatarr_config::load as load_config;
use curatarr_infrastructure::{init_database, SqliteAlbumRepository, SqliteArtistRepository};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "curatarr")]
#[command(about = "Matches catalog albums against the folders of a music library")]
#[command(version)]
struct Args {
    /// TOML configuration file, layered under CURATARR_* environment variables
    #[arg(short, long, env = "CURATARR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    init_tracing(&config.telemetry.log_level);

    let pool = init_database(&config).await?;
    let state = AppState::new(
        config.clone(),
        Arc::new(SqliteArtistRepository::new(pool.clone())),
        Arc::new(SqliteAlbumRepository::new(pool)),
    );
    state.on_start();

    let listener = TcpListener::bind(bind_addr(&config.http)?).await?;
    let addr = listener.local_addr()?;
    info!(target: "cli", "listening on {}", addr);

    serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(default_level: &str) {
    let fmt_layer = fmt::layer().with_target(true).with_thread_names(true).with_level(true);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn bind_addr(http: &curatarr_config::HttpConfig) -> Result<SocketAddr> {
    let addr = format!("{}:{}", http.host, http.port);
    addr.parse()
        .with_context(|| format!("invalid listen address {addr}"))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (Ok(mut interrupt), Ok(mut terminate)) =
            (signal(SignalKind::interrupt()), signal(SignalKind::terminate()))
        else {
            tracing::warn!(target: "cli", "could not install signal handlers, falling back to ctrl-c");
            let _ = tokio::signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!(target: "cli", "shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_parsing() {
        let http = curatarr_config::HttpConfig {
            host: "127.0.0.1".to_string(),
            port: 5160,
        };
        let addr = bind_addr(&http).unwrap();
        assert_eq!(addr.port(), 5160);
        assert!(addr.is_ipv4());
    }

    #[test]
    fn bind_addr_ipv6() {
        let http = curatarr_config::HttpConfig {
            host: "[::1]".to_string(),
            port: 8080,
        };
        assert!(bind_addr(&http).unwrap().is_ipv6());
    }

    #[test]
    fn bad_host_is_an_error() {
        let http = curatarr_config::HttpConfig {
            host: "not a host".to_string(),
            port: 8080,
        };
        assert!(bind_addr(&http).is_err());
    }

    #[test]
    fn config_flag_is_read_in_both_forms() {
        let args = Args::try_parse_from(["curatarr", "--config", "/etc/curatarr.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/curatarr.toml")));

        let args = Args::try_parse_from(["curatarr", "--config=curatarr.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("curatarr.toml")));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(Args::try_parse_from(["curatarr", "--confg", "x.toml"]).is_err());
        assert!(Args::try_parse_from(["curatarr", "--config"]).is_err());
    }

    #[test]
    fn help_does_not_start_the_server() {
        let err = Args::try_parse_from(["curatarr", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn args_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
