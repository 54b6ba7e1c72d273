//! Minimal HTTP/1.1 server speaking just enough of the S3 REST dialect for
//! integration tests: path-style `HEAD`/`GET /bucket/key` with ETag,
//! `GET /bucket?list-type=2` paged listings, plus fixed raw routes for JSON
//! resolvers and signed URLs.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct State {
    /// bucket -> key -> (body, etag)
    buckets: HashMap<String, BTreeMap<String, (Vec<u8>, String)>>,
    /// exact path -> body
    routes: HashMap<String, Vec<u8>>,
    /// exact path -> status line answered instead of any content
    failures: HashMap<String, String>,
    page_size: usize,
    requests: Vec<String>,
}

#[derive(Clone)]
pub struct ObjectServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl ObjectServer {
    /// Start in a background thread; listings return at most `page_size` keys per page.
    pub fn start(page_size: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State {
            page_size: page_size.max(1),
            ..State::default()
        }));
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    /// Endpoint template for `StorageConfig::endpoint`.
    pub fn endpoint(&self) -> String {
        format!("{}/{{bucket}}", self.base)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn put(&self, bucket: &str, key: &str, body: &[u8], etag: &str) {
        self.state
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), (body.to_vec(), etag.to_string()));
    }

    pub fn route(&self, path: &str, body: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), body.to_vec());
    }

    /// Answer every request for `path` with `status`, e.g. `500 Internal Server Error`.
    pub fn fail(&self, path: &str, status: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(path.to_string(), status.to_string());
    }

    /// Request lines seen so far, e.g. `GET /src/a.txt`.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, target) = parse_request(request);
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (target, None),
    };

    let mut st = state.lock().unwrap();
    st.requests.push(format!("{} {}", method, target));
    let head_only = method.eq_ignore_ascii_case("HEAD");
    if !head_only && !method.eq_ignore_ascii_case("GET") && !method.eq_ignore_ascii_case("POST") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    if let Some(status) = st.failures.get(path) {
        respond(&mut stream, status, &[], b"", head_only);
        return;
    }

    if let Some(body) = st.routes.get(path) {
        respond(&mut stream, "200 OK", &[], body, head_only);
        return;
    }

    let trimmed = path.trim_start_matches('/');
    let (bucket, key) = trimmed.split_once('/').unwrap_or((trimmed, ""));
    let Some(objects) = st.buckets.get(bucket) else {
        respond(&mut stream, "404 Not Found", &[], b"<Error><Code>NoSuchBucket</Code></Error>", head_only);
        return;
    };

    if key.is_empty() {
        let params: HashMap<String, String> = url::form_urlencoded::parse(query.unwrap_or("").as_bytes())
            .into_owned()
            .collect();
        let prefix = params.get("prefix").cloned().unwrap_or_default();
        let start: usize = params
            .get("continuation-token")
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        let matching: Vec<(&String, &(Vec<u8>, String))> =
            objects.iter().filter(|(k, _)| k.starts_with(&prefix)).collect();
        let end = (start + st.page_size).min(matching.len());
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">");
        xml.push_str(&format!("<Name>{}</Name><KeyCount>{}</KeyCount>", bucket, end - start));
        for (k, (body, etag)) in &matching[start..end] {
            xml.push_str(&format!(
                "<Contents><Key>{}</Key><ETag>&quot;{}&quot;</ETag><Size>{}</Size></Contents>",
                k,
                etag,
                body.len()
            ));
        }
        if end < matching.len() {
            xml.push_str(&format!(
                "<IsTruncated>true</IsTruncated><NextContinuationToken>{}</NextContinuationToken>",
                end
            ));
        } else {
            xml.push_str("<IsTruncated>false</IsTruncated>");
        }
        xml.push_str("</ListBucketResult>");
        respond(&mut stream, "200 OK", &[], xml.as_bytes(), head_only);
        return;
    }

    match objects.get(key) {
        Some((body, etag)) => {
            let etag_header = format!("ETag: \"{}\"", etag);
            respond(&mut stream, "200 OK", &[etag_header.as_str()], body, head_only);
        }
        None => respond(&mut stream, "404 Not Found", &[], b"<Error><Code>NoSuchKey</Code></Error>", head_only),
    }
}

fn respond(stream: &mut TcpStream, status: &str, headers: &[&str], body: &[u8], head_only: bool) {
    let mut response = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status, body.len());
    for h in headers {
        response.push_str(h);
        response.push_str("\r\n");
    }
    response.push_str("\r\n");
    let _ = stream.write_all(response.as_bytes());
    if !head_only {
        let _ = stream.write_all(body);
    }
}

/// Returns (method, request target).
fn parse_request(request: &str) -> (&str, &str) {
    let line = request.lines().next().unwrap_or("");
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");
    (method, target)
}
