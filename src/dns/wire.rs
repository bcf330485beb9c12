//! DNS wire format and the resolver shared by every network transport.
//!
//! UDP, TCP, DoT and DoH differ only in how a query message reaches the
//! server and how the reply comes back. Each implements [`WireTransport`]
//! (one query in, one reply out) and [`WireResolver`] builds the five
//! lookups on top of it.

use super::resolve::{Lookup, MxRecord, NsRecord, Resolver};
use crate::base::callcontext::CallContext;
use crate::base::neterror::NetError;
use crate::handlers::Measurement;
use hickory_resolver::proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_resolver::proto::rr::{Name, RData, Record, RecordType};
use std::fmt::Write as _;
use std::net::IpAddr;

/// Longest CNAME chain followed inside a single reply.
const MAX_CNAME_CHAIN: usize = 16;

/// One DNS round trip over a specific transport.
pub trait WireTransport: Send + Sync {
    /// Send `query` and return the raw reply. No retries.
    fn round_trip<'a>(&'a self, ctx: &'a CallContext, query: &'a [u8]) -> Lookup<'a, Vec<u8>>;

    /// Transport name used in errors and measurements.
    fn network(&self) -> &'static str;

    /// Server address (endpoint or URL).
    fn address(&self) -> &str;
}

/// Parse `name` as a fully qualified domain name.
pub fn to_fqdn(name: &str) -> Result<Name, NetError> {
    let name = if name.ends_with('.') { name.to_string() } else { format!("{name}.") };
    Name::from_utf8(&name).map_err(|e| NetError::MalformedDnsMessage(e.to_string()))
}

/// Reverse-lookup name for `ip` (`in-addr.arpa.` or `ip6.arpa.`).
pub fn reverse_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa.", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            let mut name = String::with_capacity(73);
            for byte in v6.octets().iter().rev() {
                let _ = write!(name, "{:x}.{:x}.", byte & 0x0f, byte >> 4);
            }
            name.push_str("ip6.arpa.");
            name
        }
    }
}

/// Random message id.
pub fn new_query_id() -> u16 {
    let mut buf = [0u8; 2];
    if boring::rand::rand_bytes(&mut buf).is_err() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();
        return nanos as u16;
    }
    u16::from_be_bytes(buf)
}

/// Encode a recursive query for `name`/`qtype`.
pub fn encode_query(id: u16, name: &str, qtype: RecordType) -> Result<Vec<u8>, NetError> {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    message.add_query(Query::query(to_fqdn(name)?, qtype));
    message.to_vec().map_err(|e| NetError::MalformedDnsMessage(e.to_string()))
}

/// Decode and validate the reply to query `id` for `name`.
///
/// Truncated replies and non-success response codes are errors: a caller
/// either gets a complete answer section or nothing.
pub fn decode_reply(id: u16, reply: &[u8], name: &str) -> Result<Message, NetError> {
    let message =
        Message::from_vec(reply).map_err(|e| NetError::MalformedDnsMessage(e.to_string()))?;
    if message.message_type() != MessageType::Response {
        return Err(NetError::MalformedDnsMessage("reply is not a response".into()));
    }
    if message.id() != id {
        return Err(NetError::MalformedDnsMessage(format!(
            "reply id {} does not match query id {}",
            message.id(),
            id
        )));
    }
    if message.truncated() {
        return Err(NetError::DnsTruncated);
    }
    match message.response_code() {
        ResponseCode::NoError => Ok(message),
        ResponseCode::NXDomain => Err(NetError::NxDomain { domain: name.to_string() }),
        rcode => Err(NetError::DnsServerFailure {
            domain: name.to_string(),
            rcode: format!("{rcode:?}"),
        }),
    }
}

/// A and AAAA addresses found in `records`.
pub fn addresses<'r>(records: impl IntoIterator<Item = &'r Record>) -> Vec<IpAddr> {
    records
        .into_iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(IpAddr::V4(a.0)),
            RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
            _ => None,
        })
        .collect()
}

/// PTR targets found in `records`.
pub fn ptr_names<'r>(records: impl IntoIterator<Item = &'r Record>) -> Vec<String> {
    records
        .into_iter()
        .filter_map(|r| match r.data() {
            RData::PTR(ptr) => Some(ptr.0.to_string()),
            _ => None,
        })
        .collect()
}

/// MX records found in `records`, sorted by preference.
pub fn mx_records<'r>(records: impl IntoIterator<Item = &'r Record>) -> Vec<MxRecord> {
    let mut mx: Vec<MxRecord> = records
        .into_iter()
        .filter_map(|r| match r.data() {
            RData::MX(mx) => {
                Some(MxRecord { host: mx.exchange().to_string(), preference: mx.preference() })
            }
            _ => None,
        })
        .collect();
    mx.sort_by_key(|r| r.preference);
    mx
}

/// NS records found in `records`.
pub fn ns_records<'r>(records: impl IntoIterator<Item = &'r Record>) -> Vec<NsRecord> {
    records
        .into_iter()
        .filter_map(|r| match r.data() {
            RData::NS(ns) => Some(NsRecord { host: ns.0.to_string() }),
            _ => None,
        })
        .collect()
}

/// Follow the CNAME chain starting at `qname`. Returns `None` when the
/// records say nothing about `qname`.
pub fn canonical_name(records: &[Record], qname: &Name) -> Option<String> {
    let mut current = qname.clone();
    let mut followed = false;
    for _ in 0..MAX_CNAME_CHAIN {
        let next = records.iter().find_map(|r| match r.data() {
            RData::CNAME(cname) if r.name() == &current => Some(cname.0.clone()),
            _ => None,
        });
        match next {
            Some(next) => {
                current = next;
                followed = true;
            }
            None => break,
        }
    }
    if followed || records.iter().any(|r| r.name() == &current) {
        Some(current.to_string())
    } else {
        None
    }
}

/// Resolver speaking DNS wire format over a [`WireTransport`].
#[derive(Debug)]
pub struct WireResolver<T> {
    transport: T,
}

impl<T: WireTransport> WireResolver<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn fail(&self, error: NetError) -> NetError {
        NetError::dns_transport(self.transport.network(), self.transport.address(), error)
    }

    async fn exchange(
        &self,
        ctx: &CallContext,
        name: &str,
        qtype: RecordType,
    ) -> Result<Message, NetError> {
        let id = new_query_id();
        let query = encode_query(id, name, qtype).map_err(|e| self.fail(e))?;

        let root = ctx.measurement_root();
        if let Some(root) = root {
            root.emit(Measurement::DnsQuery {
                transport: self.transport.network(),
                server: self.transport.address().to_string(),
                name: name.to_string(),
                qtype: qtype.to_string(),
                elapsed: root.elapsed(),
            });
        }
        tracing::debug!(
            transport = self.transport.network(),
            server = %self.transport.address(),
            %name,
            %qtype,
            "dns query"
        );

        let result = ctx
            .run(self.transport.round_trip(ctx, &query))
            .await
            .and_then(|reply| decode_reply(id, &reply, name));

        if let Some(root) = root {
            root.emit(Measurement::DnsReply {
                transport: self.transport.network(),
                server: self.transport.address().to_string(),
                name: name.to_string(),
                qtype: qtype.to_string(),
                elapsed: root.elapsed(),
                failure: result.as_ref().err().map(|e| e.failure().to_string()),
            });
        }
        result.map_err(|e| {
            tracing::debug!(
                transport = self.transport.network(),
                server = %self.transport.address(),
                %name,
                error = %e,
                "dns exchange failed"
            );
            self.fail(e)
        })
    }

    fn no_answer(&self, domain: &str, rtype: &str) -> NetError {
        self.fail(NetError::NoAnswer { domain: domain.to_string(), rtype: rtype.to_string() })
    }
}

impl<T: WireTransport> Resolver for WireResolver<T> {
    fn lookup_host<'a>(
        &'a self,
        ctx: &'a CallContext,
        hostname: &'a str,
    ) -> Lookup<'a, Vec<IpAddr>> {
        Box::pin(async move {
            let (v4, v6) = futures::future::join(
                self.exchange(ctx, hostname, RecordType::A),
                self.exchange(ctx, hostname, RecordType::AAAA),
            )
            .await;
            let mut addrs = Vec::new();
            let mut first_err = None;
            for result in [v4, v6] {
                match result {
                    Ok(message) => addrs.extend(addresses(message.answers())),
                    Err(e) if e.is_cancellation() => return Err(e),
                    Err(e) => {
                        if first_err.is_none() {
                            first_err = Some(e);
                        }
                    }
                }
            }
            if !addrs.is_empty() {
                return Ok(addrs);
            }
            Err(first_err.unwrap_or_else(|| self.no_answer(hostname, "A/AAAA")))
        })
    }

    fn lookup_addr<'a>(&'a self, ctx: &'a CallContext, addr: IpAddr) -> Lookup<'a, Vec<String>> {
        Box::pin(async move {
            let name = reverse_name(addr);
            let message = self.exchange(ctx, &name, RecordType::PTR).await?;
            let names = ptr_names(message.answers());
            if names.is_empty() {
                return Err(self.no_answer(&name, "PTR"));
            }
            Ok(names)
        })
    }

    fn lookup_cname<'a>(&'a self, ctx: &'a CallContext, host: &'a str) -> Lookup<'a, String> {
        Box::pin(async move {
            let qname = to_fqdn(host).map_err(|e| self.fail(e))?;
            let message = self.exchange(ctx, host, RecordType::A).await?;
            canonical_name(message.answers(), &qname).ok_or_else(|| self.no_answer(host, "CNAME"))
        })
    }

    fn lookup_mx<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<MxRecord>> {
        Box::pin(async move {
            let message = self.exchange(ctx, name, RecordType::MX).await?;
            let records = mx_records(message.answers());
            if records.is_empty() {
                return Err(self.no_answer(name, "MX"));
            }
            Ok(records)
        })
    }

    fn lookup_ns<'a>(&'a self, ctx: &'a CallContext, name: &'a str) -> Lookup<'a, Vec<NsRecord>> {
        Box::pin(async move {
            let message = self.exchange(ctx, name, RecordType::NS).await?;
            let records = ns_records(message.answers());
            if records.is_empty() {
                return Err(self.no_answer(name, "NS"));
            }
            Ok(records)
        })
    }
}
