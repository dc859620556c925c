//! Query dispatcher: wire decoding, per-query worker dispatch into the
//! chain, response re-encoding, and connection/session lifecycle. Owns no
//! resolution state.

pub mod tls;

use async_trait::async_trait;
use hickory_proto::op::{Header, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::Record;
use hickory_proto::xfer::Protocol;
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use hickory_server::ServerFuture;
use socket2::{Domain, Protocol as SocketProtocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use warden_dns_application::ports::ChainResolver;
use warden_dns_application::RuntimeStats;
use warden_dns_domain::config::ServerConfig;
use warden_dns_domain::{
    DnsRequest, DomainError, SecurityStatus, TransportProtocol,
};

/// Bridges hickory's request callbacks into the resolver chain.
///
/// The chain boundary lives here: every stage error is logged with its
/// structured context and converted to SERVFAIL; clients only ever see
/// DNS-level responses.
pub struct ChainRequestHandler {
    chain: Arc<dyn ChainResolver>,
    stats: Arc<RuntimeStats>,
    query_timeout: Duration,
}

impl ChainRequestHandler {
    pub fn new(
        chain: Arc<dyn ChainResolver>,
        stats: Arc<RuntimeStats>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            stats,
            query_timeout,
        }
    }

    fn to_chain_request(&self, request: &Request) -> DnsRequest {
        let mut inner = hickory_proto::op::Message::new(
            request.id(),
            MessageType::Query,
            OpCode::Query,
        );
        inner.set_recursion_desired(request.header().recursion_desired());

        let query = request.query();
        let mut question = Query::new();
        question.set_name(query.name().into());
        question.set_query_type(query.query_type());
        question.set_query_class(query.query_class());
        inner.add_query(question);

        let protocol = match request.protocol() {
            Protocol::Udp => TransportProtocol::Udp,
            _ => TransportProtocol::Tcp,
        };

        DnsRequest::new(request.src().ip(), protocol, inner)
    }

    async fn send<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
        rcode: ResponseCode,
        answers: &[Record],
        name_servers: &[Record],
        authentic: bool,
    ) -> ResponseInfo {
        let mut header = Header::response_from_request(request.header());
        header.set_recursion_available(true);
        header.set_response_code(rcode);
        header.set_authentic_data(authentic);

        let builder = MessageResponseBuilder::from_message_request(request);
        let response = builder.build(
            header,
            answers.iter(),
            name_servers.iter(),
            std::iter::empty(),
            std::iter::empty(),
        );

        match response_handle.send_response(response).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, client = %request.src(), "Failed to send response");
                serve_failed()
            }
        }
    }
}

#[async_trait]
impl RequestHandler for ChainRequestHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        if request.header().message_type() != MessageType::Query
            || request.header().op_code() != OpCode::Query
        {
            debug!(client = %request.src(), "Refusing non-query message");
            return self
                .send(request, response_handle, ResponseCode::Refused, &[], &[], false)
                .await;
        }

        let chain_request = self.to_chain_request(request);
        let result = tokio::time::timeout(
            self.query_timeout,
            self.chain.resolve(&chain_request),
        )
        .await
        .unwrap_or(Err(DomainError::UpstreamTimeout));

        match result {
            Ok(response) => {
                self.stats.record(response.rtype);
                debug!(
                    request = %chain_request.summary(),
                    rtype = %response.rtype,
                    reason = %response.reason,
                    "Query resolved"
                );
                let answers: Vec<Record> = response.message.answers().to_vec();
                let name_servers: Vec<Record> = response.message.name_servers().to_vec();
                self.send(
                    request,
                    response_handle,
                    response.message.response_code(),
                    &answers,
                    &name_servers,
                    response.security == SecurityStatus::Secure,
                )
                .await
            }
            Err(e) => {
                self.stats.record_failure();
                // Timeouts and refusals surface as plain SERVFAIL; every
                // other kind is unexpected and logged loudly.
                match &e {
                    DomainError::UpstreamTimeout | DomainError::UpstreamRefused => {
                        debug!(request = %chain_request.summary(), error = %e, "Query failed")
                    }
                    _ => {
                        warn!(request = %chain_request.summary(), error = %e, "Stage error")
                    }
                }
                self.send(request, response_handle, ResponseCode::ServFail, &[], &[], false)
                    .await
            }
        }
    }
}

fn serve_failed() -> ResponseInfo {
    let mut header = Header::new();
    header.set_response_code(ResponseCode::ServFail);
    header.into()
}

/// Bind and run every configured listener on one `ServerFuture`.
pub struct DnsServer {
    config: ServerConfig,
    handler: ChainRequestHandler,
}

impl DnsServer {
    pub fn new(config: ServerConfig, handler: ChainRequestHandler) -> Self {
        Self { config, handler }
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<(), DomainError> {
        let idle_timeout = Duration::from_secs(self.config.idle_timeout_secs);
        let mut server = ServerFuture::new(self.handler);

        for bind in &self.config.bind {
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| DomainError::InvalidConfig(format!("bad bind '{bind}': {e}")))?;

            server.register_socket(tuned_udp_socket(addr)?);
            let tcp = TcpListener::bind(addr)
                .await
                .map_err(|e| DomainError::Io(format!("bind TCP {addr}: {e}")))?;
            server.register_listener(tcp, idle_timeout);
            info!(bind = %addr, "DNS listener ready (UDP/TCP)");
        }

        #[cfg(any(feature = "dns-over-rustls", feature = "dns-over-https"))]
        if !self.config.bind_tls.is_empty() || !self.config.bind_https.is_empty() {
            let (cert_file, key_file) = match (
                &self.config.tls_cert_file,
                &self.config.tls_key_file,
            ) {
                (Some(cert), Some(key)) => (cert.clone(), key.clone()),
                _ => {
                    return Err(DomainError::InvalidConfig(
                        "TLS listeners require tls_cert_file and tls_key_file".into(),
                    ))
                }
            };
            let tls_config = tls::load_tls_config(&cert_file, &key_file)?;

            #[cfg(feature = "dns-over-rustls")]
            for bind in &self.config.bind_tls {
                let addr: SocketAddr = bind
                    .parse()
                    .map_err(|e| DomainError::InvalidConfig(format!("bad bind '{bind}': {e}")))?;
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|e| DomainError::Io(format!("bind DoT {addr}: {e}")))?;
                server
                    .register_tls_listener_with_tls_config(
                        listener,
                        idle_timeout,
                        Arc::clone(&tls_config),
                    )
                    .map_err(|e| DomainError::Io(format!("register DoT {addr}: {e}")))?;
                info!(bind = %addr, "DoT listener ready");
            }

            #[cfg(feature = "dns-over-https")]
            for bind in &self.config.bind_https {
                let addr: SocketAddr = bind
                    .parse()
                    .map_err(|e| DomainError::InvalidConfig(format!("bad bind '{bind}': {e}")))?;
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|e| DomainError::Io(format!("bind DoH {addr}: {e}")))?;
                server
                    .register_https_listener(
                        listener,
                        idle_timeout,
                        Arc::clone(&tls_config),
                        None,
                        "/dns-query".to_string(),
                    )
                    .map_err(|e| DomainError::Io(format!("register DoH {addr}: {e}")))?;
                info!(bind = %addr, "DoH listener ready");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => {}
            result = server.block_until_done() => {
                return result.map_err(|e| DomainError::Io(format!("server terminated: {e}")));
            }
        }

        info!("Draining in-flight queries");
        let drain = Duration::from_secs(self.config.drain_timeout_secs);
        let _ = tokio::time::timeout(drain, server.shutdown_gracefully()).await;
        Ok(())
    }
}

/// UDP socket with enlarged buffers; defaults (~256KB) drop bursts that
/// 4-8MB absorbs.
fn tuned_udp_socket(addr: SocketAddr) -> Result<UdpSocket, DomainError> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(SocketProtocol::UDP))
        .map_err(|e| DomainError::Io(format!("create UDP socket: {e}")))?;

    socket
        .set_reuse_address(true)
        .map_err(|e| DomainError::Io(e.to_string()))?;
    #[cfg(unix)]
    socket
        .set_reuse_port(true)
        .map_err(|e| DomainError::Io(e.to_string()))?;
    socket
        .set_recv_buffer_size(8 * 1024 * 1024)
        .map_err(|e| DomainError::Io(e.to_string()))?;
    socket
        .set_send_buffer_size(4 * 1024 * 1024)
        .map_err(|e| DomainError::Io(e.to_string()))?;

    socket
        .bind(&addr.into())
        .map_err(|e| DomainError::Io(format!("bind UDP {addr}: {e}")))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| DomainError::Io(e.to_string()))?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(|e| DomainError::Io(e.to_string()))
}
