//! The real `reqwest` transport against a local socket, so status codes and
//! broken bodies are classified the way a live server would produce them.

use estat_market::{Client, ClientConfig, EstatError, Params};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Serves the same raw HTTP reply to every connection and counts requests.
struct LocalServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl LocalServer {
    fn start(reply: &'static [u8]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/getStatsData", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                read_request_head(&mut stream);
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = stream.write_all(reply);
                let _ = stream.flush();
                // dropping the stream closes the connection
            }
        });
        Self { base_url, hits }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn client(&self) -> Client {
        let config = ClientConfig {
            base_url: self.base_url.clone(),
            backoff_base: Duration::ZERO,
            backoff_cap: Duration::ZERO,
            timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        };
        Client::new("test-app-id", config).unwrap()
    }
}

fn read_request_head(stream: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
}

#[test]
fn server_error_is_retried_then_transient() {
    let server = LocalServer::start(
        b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    );
    let err = server.client().fetch_raw("0003", &Params::new()).unwrap_err();
    assert!(matches!(err, EstatError::TransientFetch { attempts: 3, .. }), "{err:?}");
    assert_eq!(server.hits(), 3);
}

#[test]
fn rate_limit_is_retried() {
    let server = LocalServer::start(
        b"HTTP/1.1 429 Too Many Requests\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    );
    let err = server.client().fetch_raw("0003", &Params::new()).unwrap_err();
    assert!(matches!(err, EstatError::TransientFetch { attempts: 3, .. }), "{err:?}");
    assert_eq!(server.hits(), 3);
}

#[test]
fn not_found_fails_without_retry() {
    let server =
        LocalServer::start(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    let err = server.client().fetch_raw("0003", &Params::new()).unwrap_err();
    assert!(matches!(err, EstatError::Http { status: 404 }), "{err:?}");
    assert_eq!(server.hits(), 1);
}

#[test]
fn body_cut_off_mid_read_is_retried_as_network_failure() {
    let server = LocalServer::start(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 5000\r\nConnection: close\r\n\r\n{\"GET_STATS",
    );
    let err = server.client().fetch_raw("0003", &Params::new()).unwrap_err();
    assert!(matches!(err, EstatError::TransientFetch { attempts: 3, .. }), "{err:?}");
    assert_eq!(server.hits(), 3);
}

#[test]
fn complete_but_malformed_body_is_a_decode_error() {
    let server = LocalServer::start(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot json!",
    );
    let err = server.client().fetch_raw("0003", &Params::new()).unwrap_err();
    assert!(matches!(err, EstatError::Decode(_)), "{err:?}");
    assert_eq!(server.hits(), 1);
}

#[test]
fn well_formed_body_is_parsed_once() {
    let body: &'static [u8] = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 77\r\nConnection: close\r\n\r\n{\"GET_STATS_DATA\":{\"RESULT\":{\"STATUS\":0},\"STATISTICAL_DATA\":{\"DATA_INF\":{}}}}";
    let server = LocalServer::start(body);
    let raw = server.client().fetch_raw("0003", &Params::new()).unwrap();
    assert!(raw.values.is_empty());
    assert_eq!(server.hits(), 1);
}
