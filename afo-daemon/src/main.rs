//! The AFO daemon: serves the six RPC-style operations over a Unix control
//! socket.
//!
//! Structurally a trimmed-down `gnosis_vpn-root::main`: this system's
//! privileged work is a single `nft`/`ip` subprocess per call rather than a
//! cross-namespace WireGuard setup, so there is no privilege-separated
//! worker child here, just signal handling, a socket accept loop, and one
//! dispatcher.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use afo_core::command::{Command, Response};
use afo_core::config::DeployerConfig;
use afo_deploy::Deployer;
use afo_nft::{validate_rule_structure, validate_syntax, RealNftOps};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};

// Avoid glibc's default allocator on Linux.
#[cfg(target_os = "linux")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

async fn socket_listener(socket_path: &Path) -> Result<UnixListener, exitcode::ExitCode> {
    match tokio::fs::try_exists(socket_path).await {
        Ok(true) => {
            tracing::info!(path = %socket_path.display(), "removing stale socket file");
            tokio::fs::remove_file(socket_path).await.map_err(|err| {
                tracing::error!(?err, "error removing stale socket file");
                exitcode::IOERR
            })?;
        }
        Ok(false) => (),
        Err(err) => {
            tracing::error!(?err, "error checking socket path");
            return Err(exitcode::IOERR);
        }
    }

    if let Some(parent) = socket_path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            tracing::error!(?err, "error creating socket directory");
            exitcode::IOERR
        })?;
    }

    let listener = UnixListener::bind(socket_path).map_err(|err| {
        tracing::error!(?err, "error binding socket");
        exitcode::OSFILE
    })?;

    tokio::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o666))
        .await
        .map_err(|err| {
            tracing::error!(?err, "error setting socket permissions");
            exitcode::NOPERM
        })?;

    Ok(listener)
}

async fn dispatch(deployer: &Deployer<RealNftOps>, nft: &RealNftOps, cmd: Command) -> Response {
    match cmd {
        Command::GetNetworkContext => {
            Response::NetworkContext(afo_net::collect_network_context().await)
        }
        Command::ValidateSyntax { rule_text, platform } => {
            let structural = validate_rule_structure(&rule_text);
            if !structural.valid {
                Response::ValidationResult(structural)
            } else {
                Response::ValidationResult(validate_syntax(nft, &rule_text, &platform).await)
            }
        }
        Command::DetectConflicts {
            proposed_rule,
            active_ruleset,
        } => {
            let active_ruleset = match active_ruleset {
                Some(ruleset) => ruleset,
                None => afo_net::collect_network_context().await.active_ruleset,
            };
            Response::ConflictReport(afo_core::classifier::detect_conflicts(
                &proposed_rule,
                &active_ruleset,
            ))
        }
        Command::DeployPolicy {
            rule_id,
            rule_content,
            approved,
            enable_heartbeat,
            heartbeat_timeout,
        } => Response::DeploymentResult(
            deployer
                .deploy_policy(
                    &rule_id,
                    &rule_content,
                    approved,
                    enable_heartbeat,
                    heartbeat_timeout.map(std::time::Duration::from_secs),
                    // The RPC transport carries no callback; a socket caller
                    // gets timeout-only supervision. In-process callers of
                    // `Deployer::deploy_policy` can still pass a `HealthProbe`.
                    None,
                    now(),
                )
                .await,
        ),
        Command::ConfirmRuleDeployment { rule_id } => {
            let success = deployer.confirm_rule_deployment(&rule_id).await;
            Response::Confirmation { success, rule_id }
        }
        Command::RollbackRule { rule_id } => {
            Response::DeploymentResult(deployer.rollback_rule(&rule_id, now()).await)
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    deployer: Arc<Deployer<RealNftOps>>,
    nft: Arc<RealNftOps>,
) {
    let mut buf = String::new();
    if let Err(err) = stream.read_to_string(&mut buf).await {
        tracing::warn!(?err, "error reading request");
        return;
    }

    let response = match serde_json::from_str::<Command>(&buf) {
        Ok(cmd) => dispatch(&deployer, &nft, cmd).await,
        Err(err) => Response::Error(format!("malformed request: {err}")),
    };

    let body = match serde_json::to_string(&response) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(?err, "error serializing response");
            return;
        }
    };

    if let Err(err) = stream.write_all(body.as_bytes()).await {
        tracing::warn!(?err, "error writing response");
    }
    let _ = stream.shutdown().await;
}

#[tokio::main]
async fn main() -> Result<(), exitcode::ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            afo_core::config::log_filter(),
        ))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting afo-daemon");

    let socket_path = afo_core::socket::socket_path();
    let listener = socket_listener(&socket_path).await?;

    let nft = Arc::new(RealNftOps);
    let deployer = Arc::new(Deployer::new(RealNftOps, DeployerConfig::from_env()));

    let mut sigterm = signal(SignalKind::terminate()).map_err(|err| {
        tracing::error!(?err, "error setting up SIGTERM handler");
        exitcode::IOERR
    })?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(|err| {
        tracing::error!(?err, "error setting up SIGINT handler");
        exitcode::IOERR
    })?;

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let deployer = deployer.clone();
                        let nft = nft.clone();
                        tokio::spawn(handle_connection(stream, deployer, nft));
                    }
                    Err(err) => tracing::warn!(?err, "error accepting connection"),
                }
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    let _ = tokio::fs::remove_file(&socket_path).await;
    Ok(())
}
