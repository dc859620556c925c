use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use warden_dns_domain::DomainError;

/// One upstream resolver endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpstreamEndpoint {
    /// Plain DNS; truncated answers retry over TCP.
    Udp { addr: SocketAddr },
    /// DNS over TLS. `host` is the certificate name, `addr` the dial target.
    Tls { host: String, addr: SocketAddr },
    /// DNS over HTTPS (`application/dns-message` POST).
    Https { url: String },
}

impl UpstreamEndpoint {
    pub fn protocol_name(&self) -> &'static str {
        match self {
            UpstreamEndpoint::Udp { .. } => "UDP",
            UpstreamEndpoint::Tls { .. } => "DoT",
            UpstreamEndpoint::Https { .. } => "DoH",
        }
    }
}

impl FromStr for UpstreamEndpoint {
    type Err = DomainError;

    /// Accepted forms: `udp:9.9.9.9:53`, a bare `9.9.9.9[:53]`,
    /// `tcp-tls:dns.quad9.net:853` (host requires a resolvable address or
    /// an IP), `https://dns.quad9.net/dns-query`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.starts_with("https://") {
            return Ok(UpstreamEndpoint::Https { url: s.to_string() });
        }

        if let Some(rest) = s.strip_prefix("tcp-tls:") {
            let (host, port) = split_host_port(rest, 853)?;
            let addr = resolve_literal(&host, port)?;
            return Ok(UpstreamEndpoint::Tls { host, addr });
        }

        let rest = s.strip_prefix("udp:").unwrap_or(s);
        let (host, port) = split_host_port(rest, 53)?;
        let addr = resolve_literal(&host, port)?;
        Ok(UpstreamEndpoint::Udp { addr })
    }
}

impl fmt::Display for UpstreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamEndpoint::Udp { addr } => write!(f, "udp:{addr}"),
            UpstreamEndpoint::Tls { host, addr } => write!(f, "tcp-tls:{host}@{addr}"),
            UpstreamEndpoint::Https { url } => write!(f, "{url}"),
        }
    }
}

fn split_host_port(s: &str, default_port: u16) -> Result<(String, u16), DomainError> {
    // Bracketed IPv6 literal: [::1]:853
    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| DomainError::InvalidConfig(format!("unclosed '[' in '{s}'")))?;
        let port = match tail.strip_prefix(':') {
            Some(p) => p
                .parse()
                .map_err(|_| DomainError::InvalidConfig(format!("bad port in '{s}'")))?,
            None => default_port,
        };
        return Ok((host.to_string(), port));
    }

    // A plain IPv6 literal has more than one colon and no port notation.
    if s.matches(':').count() > 1 {
        return Ok((s.to_string(), default_port));
    }

    match s.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| DomainError::InvalidConfig(format!("bad port in '{s}'")))?;
            Ok((host.to_string(), port))
        }
        None => Ok((s.to_string(), default_port)),
    }
}

fn resolve_literal(host: &str, port: u16) -> Result<SocketAddr, DomainError> {
    // IP literals only; hostname endpoints are resolved at startup via the
    // system resolver and handed in as literals.
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    use std::net::ToSocketAddrs;
    (host, port)
        .to_socket_addrs()
        .map_err(|e| DomainError::InvalidConfig(format!("cannot resolve '{host}': {e}")))?
        .next()
        .ok_or_else(|| DomainError::InvalidConfig(format!("'{host}' resolved to no address")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_udp_forms() {
        let ep: UpstreamEndpoint = "udp:9.9.9.9:53".parse().unwrap();
        assert_eq!(
            ep,
            UpstreamEndpoint::Udp {
                addr: "9.9.9.9:53".parse().unwrap()
            }
        );

        let ep: UpstreamEndpoint = "9.9.9.9".parse().unwrap();
        assert_eq!(
            ep,
            UpstreamEndpoint::Udp {
                addr: "9.9.9.9:53".parse().unwrap()
            }
        );
    }

    #[test]
    fn test_ipv6_forms() {
        let ep: UpstreamEndpoint = "[2620:fe::fe]:53".parse().unwrap();
        assert_eq!(
            ep,
            UpstreamEndpoint::Udp {
                addr: "[2620:fe::fe]:53".parse().unwrap()
            }
        );

        let ep: UpstreamEndpoint = "2620:fe::fe".parse().unwrap();
        assert!(matches!(ep, UpstreamEndpoint::Udp { addr } if addr.port() == 53));
    }

    #[test]
    fn test_tls_with_ip_literal() {
        let ep: UpstreamEndpoint = "tcp-tls:9.9.9.9:853".parse().unwrap();
        assert!(matches!(ep, UpstreamEndpoint::Tls { addr, .. } if addr.port() == 853));
    }

    #[test]
    fn test_https() {
        let ep: UpstreamEndpoint = "https://dns.quad9.net/dns-query".parse().unwrap();
        assert_eq!(ep.protocol_name(), "DoH");
    }

    #[test]
    fn test_bad_port_rejected() {
        assert!("udp:9.9.9.9:notaport".parse::<UpstreamEndpoint>().is_err());
    }
}
