//! Server construction and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anvil_dns_application::{Reporter, ZoneResolver};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tracing::info;

use crate::dns::handler::QueryHandler;
use crate::dns::tcp::TcpServer;
use crate::dns::udp::UdpServer;

/// EDNS buffer size advertised when the config leaves it unset.
const DEFAULT_BUFFER_SIZE: u16 = 1220;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Listener task failed: {0}")]
    Task(String),
}

/// Server configuration. Immutable once the server is constructed.
pub struct ServerConfig {
    /// EDNS buffer size advertised to clients. Zero selects the 1220 octet
    /// default.
    pub buffer_size: u16,

    /// Maps query names to the zones this server is authoritative for.
    pub resolver: Arc<dyn ZoneResolver>,

    /// Optional sink for internal failures.
    pub reporter: Option<Arc<dyn Reporter>>,
}

/// An authoritative DNS server answering for the zones its resolver yields.
///
/// The server owns no record storage: every query re-resolves its zone and
/// records through the configured callbacks.
pub struct Server {
    handler: Arc<QueryHandler>,
    close: Notify,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let buffer_size = if config.buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            config.buffer_size
        };

        Self {
            handler: Arc::new(QueryHandler::new(
                buffer_size,
                config.resolver,
                config.reporter,
            )),
            close: Notify::new(),
        }
    }

    /// Serves UDP and TCP on `addr` until the first listener error or a
    /// `close` call. Both listeners are torn down before returning.
    pub async fn run(&self, addr: SocketAddr) -> Result<(), ServerError> {
        let udp = UdpServer::bind(addr, self.handler.clone()).await?;
        let tcp = TcpServer::bind(addr, self.handler.clone()).await?;

        let mut udp_task: JoinHandle<Result<(), ServerError>> =
            tokio::spawn(async move { udp.run().await });
        let mut tcp_task: JoinHandle<Result<(), ServerError>> =
            tokio::spawn(async move { tcp.run().await });

        let result = tokio::select! {
            result = &mut udp_task => join_result(result),
            result = &mut tcp_task => join_result(result),
            _ = self.close.notified() => {
                info!(addr = %addr, "Shutdown requested");
                Ok(())
            }
        };

        udp_task.abort();
        tcp_task.abort();

        result
    }

    /// Signals `run` to stop. Meant to be called once.
    pub fn close(&self) {
        self.close.notify_one();
    }
}

fn join_result(result: Result<Result<(), ServerError>, JoinError>) -> Result<(), ServerError> {
    match result {
        Ok(result) => result,
        Err(error) => Err(ServerError::Task(error.to_string())),
    }
}
