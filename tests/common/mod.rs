//! Loopback DNS servers for integration tests.
//!
//! Every server answers from the same small zone:
//!
//! | name                    | records                                   |
//! |-------------------------|-------------------------------------------|
//! | `dns.google`            | A 8.8.8.8, AAAA 2001:4860:4860::8888      |
//! | `probe.test`            | A 127.0.0.1                               |
//! | `www.ooni.org`          | CNAME ooni.netlify.app, A 104.198.14.52   |
//! | `ooni.org`              | MX 20 mx2.ooni.org, MX 10 mx1.ooni.org, NS |
//! | `8.8.8.8.in-addr.arpa`  | PTR dns.google                            |
//!
//! Anything else is NXDOMAIN.

#![allow(dead_code)]

use hickory_resolver::proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_resolver::proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR};
use hickory_resolver::proto::rr::{Name, RData, Record, RecordType};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

fn name(s: &str) -> Name {
    Name::from_ascii(s).unwrap()
}

fn zone(qname: &Name, qtype: RecordType) -> Option<Vec<Record>> {
    let owner = qname.to_ascii().to_ascii_lowercase();
    let rdata = match (owner.as_str(), qtype) {
        ("dns.google.", RecordType::A) => vec![RData::A(A::new(8, 8, 8, 8))],
        ("dns.google.", RecordType::AAAA) => {
            vec![RData::AAAA(AAAA::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888))]
        }
        ("dns.google.", _) => vec![],
        ("probe.test.", RecordType::A) => vec![RData::A(A::new(127, 0, 0, 1))],
        ("probe.test.", _) => vec![],
        ("www.ooni.org.", RecordType::A) => {
            let target = name("ooni.netlify.app.");
            return Some(vec![
                Record::from_rdata(qname.clone(), 60, RData::CNAME(CNAME(target.clone()))),
                Record::from_rdata(target, 60, RData::A(A::new(104, 198, 14, 52))),
            ]);
        }
        ("www.ooni.org.", _) => vec![],
        ("ooni.org.", RecordType::MX) => vec![
            RData::MX(MX::new(20, name("mx2.ooni.org."))),
            RData::MX(MX::new(10, name("mx1.ooni.org."))),
        ],
        ("ooni.org.", RecordType::NS) => vec![
            RData::NS(NS(name("ns1.ooni.org."))),
            RData::NS(NS(name("ns2.ooni.org."))),
        ],
        ("ooni.org.", _) => vec![],
        ("8.8.8.8.in-addr.arpa.", RecordType::PTR) => vec![RData::PTR(PTR(name("dns.google.")))],
        _ => return None,
    };
    Some(rdata.into_iter().map(|data| Record::from_rdata(qname.clone(), 60, data)).collect())
}

fn reply_header(query: &Message) -> Message {
    let mut reply = Message::new();
    reply
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(query.recursion_desired())
        .set_recursion_available(true);
    reply.add_queries(query.queries().to_vec());
    reply
}

/// Answer `query` from the test zone.
pub fn answer(query: &[u8]) -> Vec<u8> {
    let query = Message::from_vec(query).unwrap();
    let mut reply = reply_header(&query);
    let question = &query.queries()[0];
    match zone(question.name(), question.query_type()) {
        Some(records) => {
            reply.add_answers(records);
        }
        None => {
            reply.set_response_code(ResponseCode::NXDomain);
        }
    }
    reply.to_vec().unwrap()
}

/// Empty reply with the truncation bit set.
pub fn truncated(query: &[u8]) -> Vec<u8> {
    let query = Message::from_vec(query).unwrap();
    let mut reply = reply_header(&query);
    reply.set_truncated(true);
    reply.to_vec().unwrap()
}

/// A UDP server answering with `respond`. Returns its address and a
/// counter of the queries it received.
pub async fn udp_server_with(respond: fn(&[u8]) -> Vec<u8>) -> (SocketAddr, Arc<AtomicUsize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let queries = Arc::new(AtomicUsize::new(0));
    let counter = queries.clone();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = socket.send_to(&respond(&buf[..n]), peer).await;
        }
    });
    (addr, queries)
}

pub async fn udp_server() -> SocketAddr {
    udp_server_with(answer).await.0
}

/// A UDP socket that reads queries and never answers.
pub async fn silent_udp_server() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        while socket.recv_from(&mut buf).await.is_ok() {}
    });
    addr
}

/// DNS over TCP, any number of queries per connection.
pub async fn tcp_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_tcp(stream));
        }
    });
    addr
}

async fn serve_tcp(mut stream: TcpStream) {
    while let Ok(len) = stream.read_u16().await {
        let mut query = vec![0u8; len as usize];
        if stream.read_exact(&mut query).await.is_err() {
            return;
        }
        let reply = answer(&query);
        let mut frame = (reply.len() as u16).to_be_bytes().to_vec();
        frame.extend_from_slice(&reply);
        if stream.write_all(&frame).await.is_err() {
            return;
        }
    }
}

/// Plain-HTTP DoH endpoint at `/dns-query`. Returns its URL and a counter
/// of accepted connections.
pub async fn doh_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(serve_http(stream));
        }
    });
    (format!("http://{addr}/dns-query"), connections)
}

async fn serve_http(mut stream: TcpStream) {
    let mut buf = Vec::new();
    loop {
        let head_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let mut chunk = [0u8; 2048];
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let close = head.contains("connection: close");

        while buf.len() < head_end + content_length {
            let mut chunk = [0u8; 2048];
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        let query: Vec<u8> = buf[head_end..head_end + content_length].to_vec();
        buf.drain(..head_end + content_length);

        let response = if head.starts_with("post /dns-query ")
            && head.contains("content-type: application/dns-message")
        {
            let reply = answer(&query);
            let mut response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/dns-message\r\nContent-Length: {}\r\n\r\n",
                reply.len()
            )
            .into_bytes();
            response.extend_from_slice(&reply);
            response
        } else {
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_vec()
        };
        if stream.write_all(&response).await.is_err() || close {
            return;
        }
    }
}
