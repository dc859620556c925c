//! Message construction and surgery on top of `hickory-proto`.
//!
//! Everything that synthesizes or rewrites DNS messages lives here: query
//! building for upstream transports, block-answer synthesis, TTL rewriting
//! on cache retrieval, and the record extractors the blocking stage uses
//! for deep CNAME and answer-IP inspection.

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{rdata, DNSClass, Name, RData, Record, RecordType};
use std::net::IpAddr;
use std::str::FromStr;
use warden_dns_domain::config::{BlockMode, BlockingConfig};
use warden_dns_domain::DomainError;

/// Build a recursive query in wire-ready form.
pub fn build_query(name: &str, qtype: RecordType) -> Result<Message, DomainError> {
    let name = Name::from_str(name)
        .map_err(|e| DomainError::InvalidDomainName(format!("'{name}': {e}")))?;

    let mut query = Query::new();
    query.set_name(name);
    query.set_query_type(qtype);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(query);
    Ok(message)
}

pub fn serialize(message: &Message) -> Result<Vec<u8>, DomainError> {
    message
        .to_vec()
        .map_err(|e| DomainError::InvalidDnsResponse(format!("serialize: {e}")))
}

pub fn parse(bytes: &[u8]) -> Result<Message, DomainError> {
    Message::from_vec(bytes).map_err(|e| DomainError::InvalidDnsResponse(format!("decode: {e}")))
}

/// Start a response mirroring the request's id, question, and RD flag.
pub fn response_for(request: &Message, rcode: ResponseCode) -> Message {
    let mut response = Message::new(request.id(), MessageType::Response, OpCode::Query);
    response.set_recursion_desired(request.recursion_desired());
    response.set_recursion_available(true);
    response.set_response_code(rcode);
    for query in request.queries() {
        response.add_query(query.clone());
    }
    response
}

/// NOERROR response carrying `records` as the answer section.
pub fn answer_response(request: &Message, records: Vec<Record>) -> Message {
    let mut response = response_for(request, ResponseCode::NoError);
    for record in records {
        response.add_answer(record);
    }
    response
}

/// Rewrite every answer TTL to `ttl` (remaining TTL on cache retrieval).
pub fn rewrite_ttls(message: &mut Message, ttl: u32) {
    let answers: Vec<Record> = message
        .take_answers()
        .into_iter()
        .map(|mut record| {
            record.set_ttl(ttl);
            record
        })
        .collect();
    message.insert_answers(answers);
}

/// Minimum TTL over the answer section.
pub fn min_ttl(message: &Message) -> Option<u32> {
    message.answers().iter().map(|record| record.ttl()).min()
}

/// Addresses in the answer section (A and AAAA records).
pub fn answer_ips(message: &Message) -> Vec<IpAddr> {
    message
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::A(a) => Some(IpAddr::V4(a.0)),
            RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
            _ => None,
        })
        .collect()
}

/// CNAME targets in the answer section, lowercased without trailing dot.
pub fn cname_targets(message: &Message) -> Vec<String> {
    message
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            RData::CNAME(cname) => Some(
                cname
                    .0
                    .to_utf8()
                    .trim_end_matches('.')
                    .to_ascii_lowercase(),
            ),
            _ => None,
        })
        .collect()
}

/// Synthesize the answer for a blocked query.
///
/// Default mode answers the zero address for A/AAAA (NOERROR) and NXDOMAIN
/// for every other type; `nx-domain` forces NXDOMAIN throughout; `sinkhole`
/// substitutes the configured address of the matching family and falls back
/// to NXDOMAIN when none is configured for it.
pub fn blocked_response(request: &Message, config: &BlockingConfig) -> Message {
    let qtype = request
        .queries()
        .first()
        .map(|q| q.query_type())
        .unwrap_or(RecordType::A);
    let qname = request
        .queries()
        .first()
        .map(|q| q.name().clone())
        .unwrap_or_else(Name::root);
    let ttl = config.block_ttl_secs;

    let rdata = match (config.block_mode, qtype) {
        (BlockMode::NxDomain, _) => None,
        (BlockMode::ZeroIp, RecordType::A) => Some(RData::A(rdata::A::from(
            std::net::Ipv4Addr::UNSPECIFIED,
        ))),
        (BlockMode::ZeroIp, RecordType::AAAA) => Some(RData::AAAA(rdata::AAAA::from(
            std::net::Ipv6Addr::UNSPECIFIED,
        ))),
        (BlockMode::Sinkhole, RecordType::A) => config
            .sinkhole_ipv4
            .map(|ip| RData::A(rdata::A::from(ip))),
        (BlockMode::Sinkhole, RecordType::AAAA) => config
            .sinkhole_ipv6
            .map(|ip| RData::AAAA(rdata::AAAA::from(ip))),
        _ => None,
    };

    match rdata {
        Some(rdata) => answer_response(request, vec![Record::from_rdata(qname, ttl, rdata)]),
        None => response_for(request, ResponseCode::NXDomain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn request(qtype: RecordType) -> Message {
        build_query("doubleclick.net", qtype).unwrap()
    }

    #[test]
    fn test_response_mirrors_request() {
        let req = request(RecordType::A);
        let resp = response_for(&req, ResponseCode::NoError);
        assert_eq!(resp.id(), req.id());
        assert_eq!(resp.queries(), req.queries());
        assert!(resp.recursion_available());
    }

    #[test]
    fn test_blocked_zero_ip_for_a() {
        let config = BlockingConfig::default();
        let resp = blocked_response(&request(RecordType::A), &config);
        assert_eq!(resp.response_code(), ResponseCode::NoError);
        assert_eq!(answer_ips(&resp), vec![IpAddr::V4(Ipv4Addr::UNSPECIFIED)]);
        assert_eq!(min_ttl(&resp), Some(config.block_ttl_secs));
    }

    #[test]
    fn test_blocked_nxdomain_for_non_address_types() {
        let config = BlockingConfig::default();
        let resp = blocked_response(&request(RecordType::TXT), &config);
        assert_eq!(resp.response_code(), ResponseCode::NXDomain);
        assert!(resp.answers().is_empty());
    }

    #[test]
    fn test_blocked_sinkhole() {
        let config = BlockingConfig {
            block_mode: BlockMode::Sinkhole,
            sinkhole_ipv4: Some("192.0.2.1".parse().unwrap()),
            ..BlockingConfig::default()
        };
        let resp = blocked_response(&request(RecordType::A), &config);
        assert_eq!(
            answer_ips(&resp),
            vec![IpAddr::V4("192.0.2.1".parse().unwrap())]
        );

        // No IPv6 sinkhole configured: AAAA falls back to NXDOMAIN.
        let resp = blocked_response(&request(RecordType::AAAA), &config);
        assert_eq!(resp.response_code(), ResponseCode::NXDomain);
    }

    #[test]
    fn test_rewrite_ttls() {
        let req = request(RecordType::A);
        let name = Name::from_str("doubleclick.net.").unwrap();
        let mut resp = answer_response(
            &req,
            vec![Record::from_rdata(
                name,
                300,
                RData::A(rdata::A::from(Ipv4Addr::new(203, 0, 113, 1))),
            )],
        );
        rewrite_ttls(&mut resp, 200);
        assert_eq!(min_ttl(&resp), Some(200));
    }

    #[test]
    fn test_wire_round_trip() {
        let message = request(RecordType::A);
        let bytes = serialize(&message).unwrap();
        let reparsed = parse(&bytes).unwrap();
        assert_eq!(reparsed.id(), message.id());
        assert_eq!(reparsed.queries(), message.queries());
    }

    #[test]
    fn test_cname_targets_extracted() {
        let req = request(RecordType::A);
        let name = Name::from_str("doubleclick.net.").unwrap();
        let target = Name::from_str("Edge.Tracker.Example.").unwrap();
        let resp = answer_response(
            &req,
            vec![Record::from_rdata(
                name,
                60,
                RData::CNAME(rdata::CNAME(target)),
            )],
        );
        assert_eq!(cname_targets(&resp), vec!["edge.tracker.example"]);
    }
}
