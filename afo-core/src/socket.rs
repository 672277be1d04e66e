//! Unix-domain control socket client.
//!
//! Async counterpart to `gnosis_vpn-lib::socket`: connect, write the request,
//! shut down the write half so the daemon sees EOF, then read the response to
//! completion. Same four-step shape, ported onto `tokio::net::UnixStream`
//! since the rest of this crate is async end to end.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::command::{Command, Response};

pub const DEFAULT_PATH: &str = "/var/run/afo.sock";
pub const ENV_VAR: &str = "AFO_SOCKET_PATH";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("service not running at `{0}`")]
    ServiceNotRunning(PathBuf),
    #[error("error accessing socket at `{path}`: {source}")]
    SocketPathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error connecting socket at `{path}`: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed serializing command: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("error writing to socket: {0}")]
    Write(std::io::Error),
    #[error("error reading from socket: {0}")]
    Read(std::io::Error),
}

pub fn socket_path() -> PathBuf {
    std::env::var(ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_PATH))
}

pub async fn process_cmd(socket_path: &Path, cmd: &Command) -> Result<Response, Error> {
    check_path(socket_path).await?;

    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|source| Error::Connect {
            path: socket_path.to_path_buf(),
            source,
        })?;

    let json_cmd = serde_json::to_string(cmd)?;
    push_command(&mut stream, &json_cmd).await?;
    let body = pull_response(&mut stream).await?;
    serde_json::from_str(&body).map_err(Error::from)
}

async fn check_path(socket_path: &Path) -> Result<(), Error> {
    match tokio::fs::try_exists(socket_path).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::ServiceNotRunning(socket_path.to_path_buf())),
        Err(source) => Err(Error::SocketPathIo {
            path: socket_path.to_path_buf(),
            source,
        }),
    }
}

async fn push_command(socket: &mut UnixStream, json_cmd: &str) -> Result<(), Error> {
    socket
        .write_all(json_cmd.as_bytes())
        .await
        .map_err(Error::Write)?;
    socket.flush().await.map_err(Error::Write)?;
    socket.shutdown().await.map_err(Error::Write)
}

async fn pull_response(socket: &mut UnixStream) -> Result<String, Error> {
    let mut response = String::new();
    socket
        .read_to_string(&mut response)
        .await
        .map_err(Error::Read)?;
    Ok(response)
}
