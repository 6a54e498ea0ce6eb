use std::process::ExitCode;

use sessiond::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const EXIT_USAGE: u8 = 2;

/// Logs go to stderr. `RUST_LOG` overrides the default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: sessiond <config-file-path>");
        return ExitCode::from(EXIT_USAGE);
    };

    init_tracing();

    match run(&path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "sessiond exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(path: &str) -> Result<(), SessiondError> {
    let config = Config::load(path)?;
    let settings = config.validate()?;
    tracing::info!(
        addr = %settings.addr,
        rpc_path = %settings.rpc_path,
        session_expiration = ?settings.policy.expiration(),
        keepalive = ?settings.policy.keepalive(),
        verifier = ?config.verifier,
        "effective config"
    );

    let verifier = config.verifier.build().await?;
    let server = SessiondServer::builder()
        .settings(settings)
        .build(verifier)
        .await?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    server.run(cancel).await
}

/// Cancels `cancel` on SIGINT, SIGTERM or SIGHUP.
#[cfg(unix)]
async fn shutdown_on_signal(cancel: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let (Ok(mut term), Ok(mut hup)) = (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) else {
        tracing::warn!("could not install signal handlers, only ctrl-c will stop the server");
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
        return;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
        _ = hup.recv() => {}
        _ = cancel.cancelled() => return,
    }
    tracing::info!("shutdown signal received");
    cancel.cancel();
}

#[cfg(not(unix))]
async fn shutdown_on_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = cancel.cancelled() => return,
    }
    tracing::info!("shutdown signal received");
    cancel.cancel();
}
