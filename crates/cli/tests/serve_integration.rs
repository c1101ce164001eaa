//! HTTP API tests: each test runs `upline serve` as a child process on
//! its own port and speaks plain HTTP/1.1 to it over a `TcpStream`.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Once;
use std::time::Duration;

const AGENCY: &str = "fixtures/agency.json";

static PORT: AtomicU16 = AtomicU16::new(0);
static PORT_BASE: Once = Once::new();

/// Ports are offset by pid so separate test binaries never share a range.
fn next_port() -> u16 {
    PORT_BASE.call_once(|| {
        PORT.store(20000 + (std::process::id() % 20000) as u16, Ordering::SeqCst);
    });
    PORT.fetch_add(1, Ordering::SeqCst)
}

fn spawn_server(port: u16, contacts: &str) -> Child {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("workspace root");
    let child = Command::new(env!("CARGO_BIN_EXE_upline"))
        .current_dir(root)
        .env_remove("UPLINE_KNOWN_ROOT")
        .env_remove("UPLINE_FALLBACK_ROOT")
        .args(["serve", "--port", &port.to_string(), contacts])
        .args(["--config", "fixtures/upline.toml"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn upline serve");
    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child
}

struct Reply {
    status: u16,
    head: String,
    body: String,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// One request on a fresh `Connection: close` socket. Every response from
/// the server carries a Content-Length, so the body is read verbatim.
fn send(port: u16, method: &str, path: &str, headers: &[(&str, &str)], body: &str) -> Reply {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(30)))
        .expect("read timeout");

    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    if !body.is_empty() {
        request.push_str("Content-Type: application/json\r\n");
        request.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    request.push_str("Connection: close\r\n\r\n");
    request.push_str(body);
    stream.write_all(request.as_bytes()).expect("write request");

    let mut raw = String::new();
    let _ = stream.read_to_string(&mut raw);
    let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw.as_str(), ""));
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    Reply {
        status,
        head: head.to_string(),
        body: body.to_string(),
    }
}

fn http_get(port: u16, path: &str) -> (u16, String) {
    let r = send(port, "GET", path, &[], "");
    (r.status, r.body)
}

fn http_post(port: u16, path: &str, body: &str) -> (u16, String) {
    let r = send(port, "POST", path, &[], body);
    (r.status, r.body)
}

fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, body))
}

fn stop(mut child: Child) {
    child.kill().ok();
    child.wait().ok();
}

#[test]
fn health_returns_200_with_contact_count() {
    let port = next_port();
    let child = spawn_server(port, AGENCY);

    let (status, body) = http_get(port, "/health");
    stop(child);

    assert_eq!(status, 200);
    let json = json(&body);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["contacts"], 18);
    assert!(json.get("format_version").is_some());
}

#[test]
fn snapshot_supports_etag_and_if_none_match() {
    let port = next_port();
    let child = spawn_server(port, AGENCY);

    let first = send(port, "GET", "/snapshot", &[], "");
    assert_eq!(first.status, 200, "body: {}", first.body);
    assert_eq!(json(&first.body)["kind"], "OrgSnapshot");
    let etag = first.header("etag").expect("ETag header").to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));

    let cached = send(port, "GET", "/snapshot", &[("If-None-Match", etag.as_str())], "");
    assert_eq!(cached.status, 304, "matching If-None-Match should return 304");
    assert!(cached.body.is_empty(), "304 response must have empty body");

    let stale = send(port, "GET", "/snapshot", &[("If-None-Match", "\"wrong\"")], "");
    stop(child);
    assert_eq!(stale.status, 200);
}

#[test]
fn snapshot_query_selects_layout() {
    let port = next_port();
    let child = spawn_server(port, AGENCY);

    let (status, body) = http_get(
        port,
        "/snapshot?layout=flat&synthetic=flatten&omit_pipeline=true",
    );
    let (bad_status, _) = http_get(port, "/snapshot?layout=circle");
    stop(child);

    assert_eq!(status, 200);
    let json = json(&body);
    assert_eq!(json["layout"], "flat");
    assert!(json["nodes"].get("dup:3000").is_none());
    assert_eq!(json["nodes"]["c-gus"]["synthetic_group"], "dup:3000");
    assert!(json["nodes"]["c-ava"].get("pipeline").is_none());
    assert_eq!(bad_status, 400);
}

#[test]
fn issues_and_stats() {
    let port = next_port();
    let child = spawn_server(port, AGENCY);

    let (s1, issues) = http_get(port, "/issues");
    let (s2, stats) = http_get(port, "/stats");
    stop(child);

    assert_eq!(s1, 200);
    let issues = json(&issues);
    assert_eq!(issues["total"], 9);
    assert_eq!(
        issues["issues"]["upline_not_found"]["contacts"][0]["contact_id"],
        "c-hal"
    );
    assert_eq!(s2, 200);
    let stats = json(&stats);
    assert_eq!(stats["root_count"], 6);
    assert_eq!(stats["resolved_count"], 13);
}

#[test]
fn node_lookup_returns_upline_chain() {
    let port = next_port();
    let child = spawn_server(port, AGENCY);

    let (status, body) = http_get(port, "/nodes/c-dev");
    let (missing, _) = http_get(port, "/nodes/nobody");
    stop(child);

    assert_eq!(status, 200);
    let json = json(&body);
    assert_eq!(json["node"]["node_type"], "contact");
    assert_eq!(json["node"]["upline_source"], "email");
    assert_eq!(
        json["upline_chain"],
        serde_json::json!(["c-ben", "c-ava", "c-hq"])
    );
    assert_eq!(missing, 404);
}

#[test]
fn update_upline_rebuilds_snapshot() {
    let port = next_port();
    let child = spawn_server(port, AGENCY);

    let (status, body) = http_post(
        port,
        "/contacts/c-hal/upline",
        r#"{"field": "licensing_number", "value": "NPN-2001"}"#,
    );
    let (_, node) = http_get(port, "/nodes/c-hal");
    let (unknown, _) = http_post(
        port,
        "/contacts/nobody/upline",
        r#"{"field": "email", "value": "x@y.z"}"#,
    );
    let (bad_field, _) = http_post(
        port,
        "/contacts/c-hal/upline",
        r#"{"field": "phone", "value": "1"}"#,
    );
    stop(child);

    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(json(&body)["issues"]["upline_not_found"]["count"], 0);
    assert_eq!(
        json(&node)["upline_chain"],
        serde_json::json!(["c-ava", "c-hq"])
    );
    assert_eq!(unknown, 404);
    assert_eq!(bad_field, 422);
}

#[test]
fn refresh_replaces_contacts() {
    let port = next_port();
    let child = spawn_server(port, AGENCY);

    let (status, body) = http_post(
        port,
        "/refresh",
        r#"{"contacts": [{"id": "solo", "display_name": "Solo Agent", "licensing_number": "1"}]}"#,
    );
    let (_, stats) = http_get(port, "/stats");
    let (gone, _) = http_get(port, "/nodes/c-hq");
    stop(child);

    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(json(&body)["stats"]["total_contacts"], 1);
    assert_eq!(json(&stats)["root_count"], 1);
    assert_eq!(gone, 404);
}

#[test]
fn unknown_route_returns_404() {
    let port = next_port();
    let child = spawn_server(port, AGENCY);

    let (status, body) = http_get(port, "/contracts");
    stop(child);

    assert_eq!(status, 404);
    assert_eq!(json(&body)["error"], "not found");
}

#[test]
fn refresh_with_deep_chain_keeps_serving() {
    const DEPTH: usize = 20_000;
    let port = next_port();
    let child = spawn_server(port, AGENCY);

    let contacts: Vec<serde_json::Value> = (0..DEPTH)
        .map(|i| {
            let mut c = serde_json::json!({
                "id": format!("n{i}"),
                "licensing_number": format!("{}", 1_000_000 + i),
            });
            if i > 0 {
                c["upline_licensing_number"] = format!("{}", 1_000_000 + i - 1).into();
            }
            c
        })
        .collect();
    let body = serde_json::json!({ "contacts": contacts }).to_string();

    let (refresh, refresh_body) = http_post(port, "/refresh", &body);
    let (health, health_body) = http_get(port, "/health");
    let (flat, flat_body) = http_get(port, "/snapshot?layout=flat&omit_pipeline=true");
    stop(child);

    assert_eq!(refresh, 200, "body: {}", refresh_body);
    assert_eq!(health, 200);
    assert_eq!(json(&health_body)["contacts"], DEPTH);
    assert_eq!(flat, 200);
    let snapshot = json(&flat_body);
    assert_eq!(snapshot["stats"]["max_depth"], DEPTH - 1);
    assert_eq!(snapshot["nodes"][format!("n{}", DEPTH - 1)]["depth"], DEPTH - 1);
}
