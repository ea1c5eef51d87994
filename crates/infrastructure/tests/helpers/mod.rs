#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anvil_dns_infrastructure::{
    DomainError, Record, RecordHandler, RecordSet, RecordType, Server, ServerConfig, Zone,
    ZoneResolver,
};
use async_trait::async_trait;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType as WireType};
use tokio::net::{TcpStream, UdpSocket};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use anvil_dns_domain::name::parent;

/// Record store for the `example.com.` fixture zone used across the
/// integration tests.
pub struct FixtureHandler {
    apex: String,
    sets: HashMap<String, Vec<RecordSet>>,
}

impl FixtureHandler {
    pub fn new() -> Self {
        let mut sets: HashMap<String, Vec<RecordSet>> = HashMap::new();

        let mut insert = |set: RecordSet| {
            sets.entry(set.name.clone()).or_default().push(set);
        };

        insert(RecordSet::new(
            "api.example.com.",
            RecordType::A,
            vec![Record::A(Ipv4Addr::new(1, 2, 3, 4))],
        ));
        insert(RecordSet::new(
            "www.example.com.",
            RecordType::CNAME,
            vec![Record::CNAME("api.example.com.".to_string())],
        ));
        insert(RecordSet::new(
            "example.com.",
            RecordType::MX,
            vec![Record::MX {
                priority: 10,
                exchange: "mail.example.com.".to_string(),
            }],
        ));
        insert(RecordSet::new(
            "mail.example.com.",
            RecordType::A,
            vec![Record::A(Ipv4Addr::new(5, 6, 7, 8))],
        ));
        insert(RecordSet::new(
            "*.wild.example.com.",
            RecordType::A,
            vec![Record::A(Ipv4Addr::new(9, 9, 9, 9))],
        ));

        // a delegated subzone with one in-zone name server
        insert(RecordSet::new(
            "sub.example.com.",
            RecordType::NS,
            vec![Record::NS("ns1.sub.example.com.".to_string())],
        ));
        insert(RecordSet::new(
            "ns1.sub.example.com.",
            RecordType::A,
            vec![Record::A(Ipv4Addr::new(7, 7, 7, 7))],
        ));

        Self {
            apex: "example.com.".to_string(),
            sets,
        }
    }

    /// `pad-<n>.example.com.` carries a TXT set of `n` octets split into
    /// 200-octet chunks, for driving replies across the truncation
    /// threshold.
    fn padding_set(&self, name: &str) -> Option<RecordSet> {
        let label = name.strip_suffix(".example.com.")?;
        let octets: usize = label.strip_prefix("pad-")?.parse().ok()?;

        let mut chunks = Vec::new();
        let mut remaining = octets;
        while remaining > 0 {
            let chunk = remaining.min(200);
            chunks.push("x".repeat(chunk));
            remaining -= chunk;
        }

        Some(RecordSet::new(name, RecordType::TXT, vec![Record::TXT(chunks)]))
    }
}

#[async_trait]
impl RecordHandler for FixtureHandler {
    async fn lookup(
        &self,
        rtype: Option<RecordType>,
        name: &str,
    ) -> Result<Vec<RecordSet>, DomainError> {
        let mut sets = self.sets.get(name).cloned().unwrap_or_default();

        if sets.is_empty() {
            if let Some(padding) = self.padding_set(name) {
                sets.push(padding);
            }
        }

        // report covering delegations for names below a zone cut
        if sets.is_empty() {
            let mut ancestor = parent(name);
            while let Some(candidate) = ancestor {
                if candidate.eq_ignore_ascii_case(&self.apex) {
                    break;
                }
                if let Some(found) = self.sets.get(candidate) {
                    sets = found
                        .iter()
                        .filter(|s| s.rtype == RecordType::NS)
                        .cloned()
                        .collect();
                    if !sets.is_empty() {
                        break;
                    }
                }
                ancestor = parent(candidate);
            }
        }

        Ok(match rtype {
            Some(t) => sets
                .into_iter()
                .filter(|s| {
                    s.rtype == t || s.rtype == RecordType::CNAME || s.rtype == RecordType::NS
                })
                .collect(),
            None => sets,
        })
    }
}

/// Serves the fixture zone for anything under `example.com.`.
pub struct FixtureResolver {
    handler: Arc<FixtureHandler>,
}

impl FixtureResolver {
    pub fn new() -> Self {
        Self {
            handler: Arc::new(FixtureHandler::new()),
        }
    }
}

#[async_trait]
impl ZoneResolver for FixtureResolver {
    async fn resolve(&self, name: &str) -> Result<Option<Zone>, DomainError> {
        if !anvil_dns_domain::name::in_zone("example.com.", name) {
            return Ok(None);
        }

        Ok(Some(Zone::new(
            "example.com.",
            "ns1.example.com.",
            vec!["ns1.example.com.".to_string(), "ns2.example.com.".to_string()],
            self.handler.clone(),
        )))
    }
}

/// A server config over the fixture zone with defaults applied.
pub fn fixture_config() -> ServerConfig {
    ServerConfig {
        buffer_size: 0,
        resolver: Arc::new(FixtureResolver::new()),
        reporter: None,
    }
}

/// Starts a fixture server on the given local port and waits until it
/// answers.
pub async fn spawn_server(port: u16) -> SocketAddr {
    let addr: SocketAddr = format!("127.0.0.1:{}", port).parse().unwrap();

    let server = Arc::new(Server::new(fixture_config()));

    let runner = server.clone();
    tokio::spawn(async move {
        let _ = runner.run(addr).await;
    });

    // the first answered query proves the listeners are up
    let probe = build_query(1, "example.com.", WireType::SOA);
    query_udp(&addr, &probe).await;

    addr
}

pub fn build_query(id: u16, name: &str, rtype: WireType) -> Message {
    let mut message = Message::new();
    message.set_id(id);
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(Query::query(Name::from_utf8(name).unwrap(), rtype));
    message
}

pub fn build_query_with_class(id: u16, name: &str, rtype: WireType, class: DNSClass) -> Message {
    let mut query = Query::query(Name::from_utf8(name).unwrap(), rtype);
    query.set_query_class(class);

    let mut message = Message::new();
    message.set_id(id);
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(query);
    message
}

pub fn with_edns(mut message: Message, payload: u16, version: u8) -> Message {
    let mut edns = Edns::new();
    edns.set_max_payload(payload);
    edns.set_version(version);
    message.set_edns(edns);
    message
}

/// Sends a query over UDP and returns the decoded reply, retrying while the
/// server is still starting up.
pub async fn query_udp(addr: &SocketAddr, message: &Message) -> Message {
    let wire = message.to_vec().unwrap();
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut buf = vec![0u8; 65_535];

    for _ in 0..20 {
        socket.send_to(&wire, addr).await.unwrap();

        if let Ok(Ok(len)) = timeout(Duration::from_millis(250), socket.recv(&mut buf)).await {
            return Message::from_vec(&buf[..len]).unwrap();
        }
    }

    panic!("no reply from {} for {:?}", addr, message.queries());
}

/// Sends a query over UDP and returns the raw reply bytes.
pub async fn query_udp_raw(addr: &SocketAddr, message: &Message) -> Vec<u8> {
    let wire = message.to_vec().unwrap();
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut buf = vec![0u8; 65_535];

    for _ in 0..20 {
        socket.send_to(&wire, addr).await.unwrap();

        if let Ok(Ok(len)) = timeout(Duration::from_millis(250), socket.recv(&mut buf)).await {
            return buf[..len].to_vec();
        }
    }

    panic!("no reply from {} for {:?}", addr, message.queries());
}

/// Sends raw bytes over UDP and reports whether any reply arrives within
/// half a second. Used for the silent-drop cases.
pub async fn udp_reply_arrives(addr: &SocketAddr, wire: &[u8]) -> bool {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(wire, addr).await.unwrap();

    let mut buf = vec![0u8; 65_535];
    timeout(Duration::from_millis(500), socket.recv(&mut buf))
        .await
        .is_ok()
}

/// Sends a query over TCP with RFC 1035 framing and returns the decoded
/// reply.
pub async fn query_tcp(addr: &SocketAddr, message: &Message) -> Message {
    let wire = message.to_vec().unwrap();
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(&(wire.len() as u16).to_be_bytes())
        .await
        .unwrap();
    stream.write_all(&wire).await.unwrap();

    let mut len = [0u8; 2];
    stream.read_exact(&mut len).await.unwrap();
    let mut data = vec![0u8; u16::from_be_bytes(len) as usize];
    stream.read_exact(&mut data).await.unwrap();

    Message::from_vec(&data).unwrap()
}

/// The IPv4 addresses carried by the A records in a section.
pub fn a_addrs(records: &[hickory_proto::rr::Record]) -> Vec<Ipv4Addr> {
    records
        .iter()
        .filter_map(|r| match r.data() {
            Some(RData::A(a)) => Some(a.0),
            _ => None,
        })
        .collect()
}
