/*!
 * Blocking mock HTTP endpoint for end-to-end tests.
 *
 * Accepts connections on an ephemeral localhost port, parses each request
 * (head plus a `content-length` body), hands it to the test through a
 * channel and answers with a canned raw response. Connections are served
 * until the client closes them, so keep-alive reuse works.
 */
#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

/// Mixed-case names and a non-standard reason phrase, as real servers send.
pub const OK_RESPONSE: &[u8] = b"HTTP/1.1 200 Fine\r\nContent-Length: 2\r\nX-Trace: A\r\n\r\nok";

/// `"ok"` gzip-encoded.
pub const GZIP_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: 22\r\n\r\n\x1f\x8b\x08\x00\x00\x00\x00\x00\x02\xff\xcb\xcf\x06\x00\x47\xdd\xdc\x79\x02\x00\x00\x00";

pub const CHUNKED_RESPONSE: &[u8] =
    b"HTTP/1.1 201 Created\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nok\r\n3\r\n!!!\r\n0\r\n\r\n";

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    /// Header names in received order.
    pub fn header_names(&self) -> Vec<&str> {
        self.headers.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// All values of `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    received: Receiver<ReceivedRequest>,
}

impl MockServer {
    /// Answers every request with `response`.
    pub fn start(response: &'static [u8]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = crossbeam_channel::unbounded();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let tx = tx.clone();
                thread::spawn(move || serve(stream, &tx, response));
            }
        });

        Self { addr, received: rx }
    }

    /// Accepts connections and reads requests but never answers.
    pub fn silent() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let (_tx, rx) = crossbeam_channel::unbounded();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                thread::spawn(move || {
                    let _held = stream;
                    thread::sleep(Duration::from_secs(5));
                });
            }
        });

        Self { addr, received: rx }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Next request the server received, waiting up to two seconds.
    pub fn next_request(&self) -> ReceivedRequest {
        self.received
            .recv_timeout(Duration::from_secs(2))
            .expect("mock server received no request")
    }
}

/// A localhost port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

fn serve(stream: TcpStream, tx: &Sender<ReceivedRequest>, response: &[u8]) {
    let Ok(write_half) = stream.try_clone() else { return };
    let mut writer = write_half;
    let mut reader = BufReader::new(stream);

    while let Some(request) = read_request(&mut reader) {
        let _ = tx.send(request);
        if writer.write_all(response).and_then(|()| writer.flush()).is_err() {
            return;
        }
    }
}

fn read_request(reader: &mut impl BufRead) -> Option<ReceivedRequest> {
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).ok()? == 0 {
        return None;
    }

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.to_string(), value.trim().to_string()));
    }

    let length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    Some(ReceivedRequest {
        request_line: request_line.trim_end().to_string(),
        headers,
        body,
    })
}
