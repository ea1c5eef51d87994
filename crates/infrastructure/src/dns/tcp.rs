//! TCP listener (RFC 1035 §4.2.2). Messages are framed with a two-octet
//! length prefix; a connection serves queries until EOF, a write failure or
//! the idle timeout.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anvil_dns_domain::DomainError;
use hickory_proto::op::Message;
use socket2::{Domain, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, info, trace};

use super::handler::QueryHandler;
use super::Protocol;
use crate::server::ServerError;

/// Connections idle for this long are dropped.
const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) struct TcpServer {
    listener: TcpListener,
    handler: Arc<QueryHandler>,
}

impl TcpServer {
    pub(crate) async fn bind(
        addr: SocketAddr,
        handler: Arc<QueryHandler>,
    ) -> Result<Self, ServerError> {
        // Create the socket with socket2 so rebinding after a restart does
        // not trip over lingering connections in TIME_WAIT
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::STREAM, None)?;
        socket.set_reuse_address(true)?;

        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(1024)?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener)?;
        info!(addr = %listener.local_addr()?, "TCP listener bound");

        Ok(Self { listener, handler })
    }

    /// Accepts connections until the listener fails, spawning a task per
    /// connection.
    pub(crate) async fn run(&self) -> Result<(), ServerError> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let handler = self.handler.clone();

            tokio::spawn(async move {
                if let Err(error) = handle_connection(stream, peer, handler).await {
                    debug!(error = %error, client = %peer, "TCP connection closed");
                }
            });
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<QueryHandler>,
) -> io::Result<()> {
    loop {
        let data = match timeout(IDLE_TIMEOUT, read_frame(&mut stream)).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                trace!(client = %peer, "Connection closed by client");
                return Ok(());
            }
            Ok(Err(error)) => return Err(error),
            Err(_) => {
                trace!(client = %peer, "Idle connection timed out");
                return Ok(());
            }
        };

        let request = match Message::from_vec(&data) {
            Ok(message) => message,
            Err(error) => {
                debug!(error = %error, client = %peer, "Dropping undecodable message");
                continue;
            }
        };

        // filtered messages get no reply, the client gives up on its own
        if !QueryHandler::accepts(&request) {
            continue;
        }

        let Some(mut response) = handler.handle(&request).await else {
            continue;
        };

        let wire = match QueryHandler::encode(&request, &mut response, Protocol::Tcp) {
            Ok(wire) => wire,
            Err(error) => {
                handler.report(&request, error);
                continue;
            }
        };

        if let Err(error) = write_frame(&mut stream, &wire).await {
            handler.report(&request, DomainError::IoError(error.to_string()));
            return Err(error);
        }
    }
}

/// Reads one length-prefixed message; `None` on a clean EOF between
/// frames.
async fn read_frame(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    let mut len = [0u8; 2];
    match stream.read_exact(&mut len).await {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(error) => return Err(error),
    }

    let mut data = vec![0u8; u16::from_be_bytes(len) as usize];
    stream.read_exact(&mut data).await?;
    Ok(Some(data))
}

async fn write_frame(stream: &mut TcpStream, wire: &[u8]) -> io::Result<()> {
    let len = u16::try_from(wire.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "response exceeds TCP frame"))?;

    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(wire).await?;
    stream.flush().await
}
