//! UDP listener (RFC 1035 §4.2.1). One spawned task per datagram; replies
//! are truncated to the client's negotiated buffer on overflow.

use std::net::SocketAddr;
use std::sync::Arc;

use anvil_dns_domain::DomainError;
use hickory_proto::op::Message;
use socket2::{Domain, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info};

use super::handler::QueryHandler;
use super::Protocol;
use crate::server::ServerError;

/// Ample room for any inbound DNS message.
const RECV_BUFFER: usize = 65_535;

pub(crate) struct UdpServer {
    socket: Arc<UdpSocket>,
    handler: Arc<QueryHandler>,
}

impl UdpServer {
    pub(crate) async fn bind(
        addr: SocketAddr,
        handler: Arc<QueryHandler>,
    ) -> Result<Self, ServerError> {
        // Create the socket with socket2 so rebinding after a restart does
        // not trip over lingering sockets
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, None)?;
        socket.set_reuse_address(true)?;

        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket)?;
        info!(addr = %socket.local_addr()?, "UDP listener bound");

        Ok(Self {
            socket: Arc::new(socket),
            handler,
        })
    }

    /// Receives datagrams until the socket fails, spawning a task per
    /// query.
    pub(crate) async fn run(&self) -> Result<(), ServerError> {
        let mut buf = vec![0u8; RECV_BUFFER];

        loop {
            let (len, peer) = self.socket.recv_from(&mut buf).await?;
            let data = buf[..len].to_vec();
            let socket = self.socket.clone();
            let handler = self.handler.clone();

            tokio::spawn(async move {
                handle_datagram(socket, handler, data, peer).await;
            });
        }
    }
}

async fn handle_datagram(
    socket: Arc<UdpSocket>,
    handler: Arc<QueryHandler>,
    data: Vec<u8>,
    peer: SocketAddr,
) {
    let request = match Message::from_vec(&data) {
        Ok(message) => message,
        Err(error) => {
            debug!(error = %error, client = %peer, "Dropping undecodable datagram");
            return;
        }
    };

    if !QueryHandler::accepts(&request) {
        debug!(client = %peer, "Dropping non-query message");
        return;
    }

    let Some(mut response) = handler.handle(&request).await else {
        return;
    };

    let wire = match QueryHandler::encode(&request, &mut response, Protocol::Udp) {
        Ok(wire) => wire,
        Err(error) => {
            handler.report(&request, error);
            return;
        }
    };

    if let Err(error) = socket.send_to(&wire, peer).await {
        debug!(error = %error, client = %peer, "UDP write failed");
        handler.report(&request, DomainError::IoError(error.to_string()));
    }
}
