//! `sheetsync` binary: HTTP server and configuration tools

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sheetsync_server::{in_memory_service, routes, ServerConfig, VERSION};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .long("config")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file");

    Command::new("sheetsync")
        .version(VERSION)
        .about("Shared workbook server with revision sync and what-if simulation")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP API")
                .arg(config_arg.clone())
                .arg(
                    Arg::new("addr")
                        .long("addr")
                        .value_name("HOST:PORT")
                        .value_parser(value_parser!(SocketAddr))
                        .help("Listen address, overrides the configuration file"),
                )
                .arg(
                    Arg::new("log-json")
                        .long("log-json")
                        .action(ArgAction::SetTrue)
                        .help("Emit logs as JSON lines"),
                ),
        )
        .subcommand(
            Command::new("print-config")
                .about("Print the effective configuration as TOML")
                .arg(config_arg),
        )
}

fn load_config(args: &ArgMatches) -> anyhow::Result<ServerConfig> {
    let path = args.get_one::<PathBuf>("config");
    ServerConfig::load(path.map(PathBuf::as_path)).context("loading configuration")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let service = in_memory_service(config.service.clone());
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
        }
    };
    let (addr, server) = warp::serve(routes(service))
        .try_bind_with_graceful_shutdown(config.server.addr, shutdown)
        .with_context(|| format!("binding {}", config.server.addr))?;

    tracing::info!(%addr, version = VERSION, "listening");
    server.await;
    tracing::info!("shut down");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("serve", args)) => {
            let mut config = load_config(args)?;
            if let Some(addr) = args.get_one::<SocketAddr>("addr") {
                config = config.with_addr(*addr);
            }
            if args.get_flag("log-json") {
                config = config.with_log_json(true);
            }
            init_tracing(config.server.log_json);
            serve(config).await
        }
        Some(("print-config", args)) => {
            let config = load_config(args)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn serve_flags_parse() {
        let matches = cli()
            .try_get_matches_from(["sheetsync", "serve", "--addr", "0.0.0.0:9000", "--log-json"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "serve");
        assert_eq!(
            args.get_one::<SocketAddr>("addr"),
            Some(&"0.0.0.0:9000".parse().unwrap())
        );
        assert!(args.get_flag("log-json"));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(cli().try_get_matches_from(["sheetsync"]).is_err());
    }
}
