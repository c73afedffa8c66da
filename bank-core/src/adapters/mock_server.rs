//! Mock bank HTTP server for testing
//!
//! Serves the same JSON API as the real service from a background thread:
//! - POST /bank/sign_up
//! - POST /bank/transfer
//! - GET /bank/balances (with `after=N` the request is held until the
//!   version moves past N or the hold time runs out)

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use num_bigint::BigUint;

use crate::domain::{Account, BalanceSnapshot, SignUpRequest, TransferRequest};

/// How long a long-poll is held by default
const DEFAULT_HOLD: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct MockState {
    accounts: BTreeMap<String, BigUint>,
    version: u64,
    request_ids: Vec<String>,
    hold: Duration,
}

/// Mock bank server
pub struct MockLedgerServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockLedgerServer {
    /// Start a new mock server on a random available port
    pub fn start() -> std::io::Result<Self> {
        Self::start_with_hold(DEFAULT_HOLD)
    }

    /// Start a server that holds `after=N` polls for up to `hold`
    pub fn start_with_hold(hold: Duration) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(MockState {
            hold,
            ..MockState::default()
        }));

        // Non-blocking so stop() can end the accept loop
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Request ids received on mutating calls, in arrival order
    pub fn request_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().request_ids.clone()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockLedgerServer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Request {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut parts = lines.next()?.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buffer[..n]);
    }

    Some(Request {
        method,
        path,
        headers,
        body,
    })
}

fn handle_connection(mut stream: TcpStream, state: &Mutex<MockState>) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let (path, query) = request
        .path
        .split_once('?')
        .unwrap_or((request.path.as_str(), ""));

    let (status, body) = match (request.method.as_str(), path) {
        ("POST", "/bank/sign_up") => {
            record_request_id(&request, state);
            handle_sign_up(&request.body, state)
        }
        ("POST", "/bank/transfer") => {
            record_request_id(&request, state);
            handle_transfer(&request.body, state)
        }
        ("GET", "/bank/balances") => handle_balances(query_after(query), state),
        _ => error(404, "not_found", "endpoint not found"),
    };

    send_response(&mut stream, status, &body);
}

fn record_request_id(request: &Request, state: &Mutex<MockState>) {
    if let Some((_, id)) = request.headers.iter().find(|(k, _)| k == "x-request-id") {
        state.lock().unwrap().request_ids.push(id.clone());
    }
}

fn handle_sign_up(body: &[u8], state: &Mutex<MockState>) -> (u16, String) {
    let Ok(request) = serde_json::from_slice::<SignUpRequest>(body) else {
        return error(400, "invalid_input", "malformed sign-up request");
    };
    let mut state = state.lock().unwrap();
    if state.accounts.contains_key(&request.account_id) {
        return error(409, "invalid_input", "account already exists");
    }
    state
        .accounts
        .insert(request.account_id.clone(), request.initial_deposit.clone());
    state.version += 1;

    let account = Account::new(request.account_id, request.initial_deposit);
    (200, serde_json::to_string(&account).unwrap())
}

fn handle_transfer(body: &[u8], state: &Mutex<MockState>) -> (u16, String) {
    let Ok(request) = serde_json::from_slice::<TransferRequest>(body) else {
        return error(400, "invalid_input", "malformed transfer request");
    };
    let mut state = state.lock().unwrap();

    let Some(from_balance) = state.accounts.get(&request.from_account_id).cloned() else {
        return error(404, "not_found", "source account not found");
    };
    if !state.accounts.contains_key(&request.to_account_id) {
        return error(404, "not_found", "destination account not found");
    }
    if from_balance < request.amount {
        return error(422, "insufficient_funds", "insufficient funds");
    }

    state
        .accounts
        .insert(request.from_account_id.clone(), from_balance - &request.amount);
    if let Some(to) = state.accounts.get_mut(&request.to_account_id) {
        *to += &request.amount;
    }
    state.version += 1;
    (200, "{}".to_string())
}

fn query_after(query: &str) -> Option<u64> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "after")
        .and_then(|(_, v)| v.parse().ok())
}

/// Answer at once, or hold until the version moves past `after`
fn handle_balances(after: Option<u64>, state: &Mutex<MockState>) -> (u16, String) {
    let started = Instant::now();
    loop {
        {
            let state = state.lock().unwrap();
            let changed = after.map_or(true, |after| state.version > after);
            if changed || started.elapsed() >= state.hold {
                return (200, serde_json::to_string(&snapshot(&state)).unwrap());
            }
        }
        thread::sleep(Duration::from_millis(5));
    }
}

fn snapshot(state: &MockState) -> BalanceSnapshot {
    BalanceSnapshot::new(
        state.version,
        state
            .accounts
            .iter()
            .map(|(id, balance)| Account::new(id.clone(), balance.clone()))
            .collect(),
    )
}

fn error(status: u16, code: &str, message: &str) -> (u16, String) {
    (
        status,
        serde_json::json!({ "code": code, "message": message }).to_string(),
    )
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_server_starts() {
        let server = MockLedgerServer::start().unwrap();
        assert!(server.base_url().starts_with("http://127.0.0.1:"));
    }

    #[test]
    fn test_mock_server_balances() {
        let server = MockLedgerServer::start().unwrap();
        let mut stream = TcpStream::connect(format!("127.0.0.1:{}", server.port)).unwrap();
        stream
            .write_all(b"GET /bank/balances HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains(r#""balances":[]"#));
    }

    #[test]
    fn test_query_after() {
        assert_eq!(query_after("after=7"), Some(7));
        assert_eq!(query_after("x=1&after=3"), Some(3));
        assert_eq!(query_after(""), None);
        assert_eq!(query_after("after=abc"), None);
    }

    #[test]
    fn test_poll_held_until_hold_expires() {
        let server = MockLedgerServer::start_with_hold(Duration::from_millis(200)).unwrap();
        let mut stream = TcpStream::connect(format!("127.0.0.1:{}", server.port)).unwrap();
        let started = Instant::now();
        stream
            .write_all(b"GET /bank/balances?after=0 HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(response.contains(r#""version":0"#));
    }
}
