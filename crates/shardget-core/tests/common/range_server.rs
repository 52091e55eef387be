//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body, one request per connection. Responds to HEAD
//! with Content-Length and Accept-Ranges: bytes; responds to GET with Range
//! with 206 Partial Content. Knobs simulate origins that block HEAD, ignore
//! ranges, fail a given range, or answer slowly, and every GET is counted so
//! tests can check the client's concurrency.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (simulates servers that block HEAD).
    pub head_allowed: bool,
    /// Answer HEAD with this status and no headers instead (overrides `head_allowed`).
    pub head_status: Option<u16>,
    /// If false, HEAD omits Content-Length.
    pub declare_length: bool,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` header even if ranges work.
    pub advertise_ranges: bool,
    /// A ranged GET starting at this offset is answered with 500.
    pub fail_range_start: Option<u64>,
    /// How many times `fail_range_start` fails before it is served normally (0 = always).
    pub fail_times: usize,
    /// Pause before answering each GET.
    pub delay: Duration,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            head_status: None,
            declare_length: true,
            support_ranges: true,
            advertise_ranges: true,
            fail_range_start: None,
            fail_times: 0,
            delay: Duration::ZERO,
        }
    }
}

/// Request counters shared with the serving threads.
#[derive(Debug, Default)]
pub struct ServerStats {
    heads: AtomicUsize,
    gets: AtomicUsize,
    failures: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ServerStats {
    pub fn heads(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Most GETs ever being served at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct RangeServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/file.bin".
    pub url: String,
    pub stats: Arc<ServerStats>,
}

/// Starts a server in a background thread serving `body`. Returns the URL.
/// The server runs until the process exits.
pub fn start(body: Vec<u8>) -> String {
    start_with_options(body, RangeServerOptions::default()).url
}

/// Like `start` but allows customizing server behavior and exposes request counters.
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let stats = Arc::new(ServerStats::default());
    let server_stats = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let stats = Arc::clone(&server_stats);
            thread::spawn(move || handle(stream, &body, opts, &stats));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/file.bin", port),
        stats,
    }
}

/// Accepts connections and reads requests but never answers. Returns the URL.
pub fn start_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    format!("http://127.0.0.1:{}/file.bin", port)
}

/// URL on a local port that nothing listens on.
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/file.bin", port)
}

fn handle(mut stream: TcpStream, body: &[u8], opts: RangeServerOptions, stats: &ServerStats) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    let total = body.len() as u64;
    let accept_ranges = if opts.advertise_ranges && opts.support_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };

    if method.eq_ignore_ascii_case("HEAD") {
        stats.heads.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = opts.head_status {
            let response = format!("HTTP/1.1 {} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", code);
            let _ = stream.write_all(response.as_bytes());
            return;
        }
        if !opts.head_allowed {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            return;
        }
        let length = if opts.declare_length {
            format!("Content-Length: {}\r\n", total)
        } else {
            String::new()
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\n{}{}ETag: \"test-etag\"\r\nConnection: close\r\n\r\n",
            length, accept_ranges
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }

    stats.enter();
    if !opts.delay.is_zero() {
        thread::sleep(opts.delay);
    }
    serve_get(&mut stream, body, range, opts, stats, accept_ranges);
    stats.leave();
}

fn serve_get(
    stream: &mut TcpStream,
    body: &[u8],
    range: Option<(u64, u64)>,
    opts: RangeServerOptions,
    stats: &ServerStats,
    accept_ranges: &str,
) {
    let total = body.len() as u64;
    let range = range.filter(|_| opts.support_ranges);

    if let (Some((start, _)), Some(fail_start)) = (range, opts.fail_range_start) {
        if start == fail_start {
            let failed_before = stats.failures.fetch_add(1, Ordering::SeqCst);
            if opts.fail_times == 0 || failed_before < opts.fail_times {
                let _ = stream.write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                );
                return;
            }
        }
    }

    let (status, content_range, slice) = match range {
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start >= total || start > end_incl {
                ("416 Range Not Satisfiable", format!("bytes */{}", total), &body[0..0])
            } else {
                let slice = &body[start as usize..=end_incl as usize];
                (
                    "206 Partial Content",
                    format!("bytes {}-{}/{}", start, end_incl, total),
                    slice,
                )
            }
        }
        None => ("200 OK", format!("bytes 0-{}/{}", total.saturating_sub(1), total), body),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Range: {}\r\n{}Connection: close\r\n\r\n",
        status,
        slice.len(),
        content_range,
        accept_ranges
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if !name.trim().eq_ignore_ascii_case("range") {
                continue;
            }
            let value = value.trim();
            if let Some(spec) = value.strip_prefix("bytes=") {
                if let Some((a, b)) = spec.split_once('-') {
                    let start = a.trim().parse::<u64>().unwrap_or(0);
                    let end = b.trim();
                    let end_incl = if end.is_empty() {
                        u64::MAX
                    } else {
                        end.parse::<u64>().unwrap_or(0)
                    };
                    range = Some((start, end_incl));
                }
            }
        }
    }
    (method, range)
}
