//! icaltester CLI entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

use icaltester_cli::cli::{Cli, Command, ConfigAction};
use icaltester_cli::commands;
use icaltester_cli::config::ClientConfig;
use icaltester_cli::error::{ClientError, ClientResult};
use icaltester_core::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let watching = matches!(cli.command, Command::Sync { watch: true, .. });
    let tracing_config = match config.logging.to_tracing_config(cli.debug, watching) {
        Ok(tracing_config) => tracing_config,
        Err(e) => {
            eprintln!("error: {}", ClientError::Config(e));
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config),
        None => ClientConfig::load().map_err(ClientError::Config),
    }
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let allow_http = cli.allow_http;

    match cli.command {
        Command::CheckUrl { url } => {
            let limits = config.fetch_limits(allow_http);
            commands::check::check_url(&mut out, &url, &limits.policy)
        }
        Command::Fetch { url, json } => {
            let limits = config.fetch_limits(allow_http);
            commands::fetch::fetch(&mut out, &url, &limits, json).await
        }
        Command::Parse { file, json } => commands::codec::parse(&mut out, &file, json),
        Command::Build {
            name,
            prod_id,
            bookings,
            output,
        } => commands::codec::build(
            &mut out,
            &name,
            prod_id.as_deref(),
            &bookings,
            output.as_deref(),
        ),
        Command::Sync {
            state,
            watch,
            subscription,
            json,
        } => {
            let state_path = config.state_path(state.as_deref());
            let sync_config = config.sync_config(allow_http);
            if watch {
                commands::sync::watch(&mut out, state_path, sync_config).await
            } else {
                commands::sync::sync_once(
                    &mut out,
                    &state_path,
                    &sync_config,
                    subscription.as_deref(),
                    json,
                )
                .await
            }
        }
        Command::Feed {
            state,
            token,
            output,
        } => {
            let state_path = config.state_path(state.as_deref());
            commands::feed::feed(&mut out, &state_path, &token, output.as_deref()).await
        }
        Command::Config { action } => {
            let config_path = cli.config.unwrap_or_else(ClientConfig::default_path);
            match action {
                ConfigAction::Dump => commands::config::dump(&mut out, &config, &config_path),
                ConfigAction::Validate => commands::config::validate(&mut out, &config),
                ConfigAction::Path => commands::config::path(&mut out, &config_path, &config),
            }
        }
    }?;

    out.flush()?;
    Ok(())
}
