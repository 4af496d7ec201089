//! Minimal HTTP/1.1 server for loader integration tests.
//!
//! Answers GET requests with a scripted sequence of replies (the last reply
//! repeats). Successful replies honor `Range: bytes=X-Y` with 206 Partial
//! Content. Every request is counted and its raw head kept for assertions.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    /// Status code, reason phrase and body.
    Status(u16, &'static str, Vec<u8>),
    /// Read the request, then hold the connection open without answering.
    Stall(Duration),
}

impl Reply {
    pub fn ok(body: &[u8]) -> Self {
        Reply::Status(200, "OK", body.to_vec())
    }

    pub fn error(status: u16, reason: &'static str) -> Self {
        Reply::Status(status, reason, Vec::new())
    }
}

#[derive(Clone)]
pub struct StatusServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StatusServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw request heads received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Value of header `name` in the `index`th request.
    pub fn request_header(&self, index: usize, name: &str) -> Option<String> {
        let requests = self.requests.lock().unwrap();
        let head = requests.get(index)?;
        head.lines().skip(1).find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.trim()
                .eq_ignore_ascii_case(name)
                .then(|| v.trim().to_string())
        })
    }
}

/// Starts a server in a background thread. The server runs until the process
/// exits.
pub fn start(replies: Vec<Reply>) -> StatusServer {
    assert!(!replies.is_empty(), "at least one reply");
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = StatusServer {
        url: format!("http://127.0.0.1:{}/media/seg.ts", port),
        hits: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let replies = Arc::new(replies);
    let state = server.clone();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let index = state.hits.fetch_add(1, Ordering::SeqCst);
            let reply = replies[index.min(replies.len() - 1)].clone();
            let requests = Arc::clone(&state.requests);
            thread::spawn(move || handle(stream, reply, &requests));
        }
    });
    server
}

fn handle(mut stream: TcpStream, reply: Reply, requests: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let head = String::from_utf8_lossy(&buf[..n]).into_owned();
    let range = parse_range(&head);
    requests.lock().unwrap().push(head);

    let (status, reason, body) = match reply {
        Reply::Stall(hold) => {
            thread::sleep(hold);
            return;
        }
        Reply::Status(status, reason, body) => (status, reason, body),
    };

    let total = body.len() as u64;
    let mut content_range = String::new();
    let (status, reason, slice) = match range {
        Some((start, end_incl)) if status == 200 && start < total => {
            let end_excl = end_incl.saturating_add(1).min(total);
            content_range = format!(
                "Content-Range: bytes {}-{}/{}\r\n",
                start,
                end_excl - 1,
                total
            );
            (206, "Partial Content", &body[start as usize..end_excl as usize])
        }
        _ => (status, reason, &body[..]),
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        reason,
        slice.len(),
        content_range
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

/// `(start, end_inclusive)` of a `Range: bytes=X-Y` header.
fn parse_range(head: &str) -> Option<(u64, u64)> {
    head.lines().skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case("range") {
            return None;
        }
        let spec = value.trim().strip_prefix("bytes=")?;
        let (a, b) = spec.split_once('-')?;
        let start = a.trim().parse().ok()?;
        let end = match b.trim() {
            "" => u64::MAX,
            b => b.parse().ok()?,
        };
        Some((start, end))
    })
}
