//! Blocking HTTP client on libcurl (via the `curl` crate).
//!
//! One easy handle per call, every call bounded by the configured connect and
//! total timeouts. Bodies are pushed into a caller-supplied `Write` sink so
//! large objects stream straight into a digest or a temp file.

mod parse;

use std::cell::Cell;
use std::io::Write;
use std::str;
use std::time::Duration;

use curl::easy::{Easy, List};
use serde::de::DeserializeOwned;

use crate::config::HttpConfig;
use crate::error::CheckError;

pub use parse::{parse_headers, status_code, HeadResult};

/// Request method plus body, if any.
enum Method<'a> {
    Head,
    Get,
    Post(&'a [u8]),
}

/// Blocking HTTP client with default headers and timeouts.
#[derive(Debug, Clone)]
pub struct HttpClient {
    connect_timeout: Duration,
    timeout: Duration,
    headers: Vec<(String, String)>,
    buffer_size: Option<usize>,
}

impl HttpClient {
    pub fn new(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            headers: Vec::new(),
            buffer_size: None,
        }
    }

    /// Add a header sent with every request (e.g. `Authorization`).
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Receive buffer size; bounds the chunk handed to the sink per callback.
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = Some(bytes);
        self
    }

    fn easy(&self, url: &str, extra: &[(&str, &str)]) -> Result<Easy, CheckError> {
        let mut easy = Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        if let Some(sz) = self.buffer_size {
            easy.buffer_size(sz)?;
        }

        let mut list = List::new();
        let mut any = false;
        for (k, v) in self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(extra.iter().copied())
        {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            any = true;
        }
        if any {
            easy.http_headers(list)?;
        }
        Ok(easy)
    }

    /// Run one request, streaming a 2xx body into `sink`. Non-2xx bodies are
    /// discarded and reported as `NotFound` (404) or `Http`.
    fn perform(
        &self,
        url: &str,
        method: Method<'_>,
        extra: &[(&str, &str)],
        sink: &mut dyn Write,
    ) -> Result<(u64, Vec<String>), CheckError> {
        let mut easy = self.easy(url, extra)?;
        match method {
            Method::Head => easy.nobody(true)?,
            Method::Get => {}
            Method::Post(body) => {
                easy.post(true)?;
                easy.post_fields_copy(body)?;
            }
        }

        let status = Cell::new(0u32);
        let mut header_lines: Vec<String> = Vec::new();
        let mut written = 0u64;
        let mut sink_err: Option<std::io::Error> = None;

        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    if let Some(code) = status_code(s) {
                        // A new response (redirect hop) starts; keep only its headers.
                        status.set(code);
                        header_lines.clear();
                    }
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                if !(200..300).contains(&status.get()) {
                    return Ok(data.len());
                }
                match sink.write_all(data) {
                    Ok(()) => {
                        written += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        sink_err = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })?;
            transfer.perform()
        };

        if let Some(e) = sink_err {
            return Err(CheckError::Io(e));
        }
        performed?;

        let code = easy.response_code()?;
        match code {
            200..=299 => Ok((written, header_lines)),
            404 => Err(CheckError::NotFound(url.to_string())),
            _ => Err(CheckError::Http {
                status: code,
                url: url.to_string(),
            }),
        }
    }

    /// HEAD request; returns the parsed metadata headers.
    pub fn head(&self, url: &str) -> Result<HeadResult, CheckError> {
        let (_, lines) = self.perform(url, Method::Head, &[], &mut std::io::sink())?;
        Ok(parse_headers(&lines))
    }

    /// GET streaming the body into `sink`; returns the number of bytes written.
    pub fn get_into(&self, url: &str, sink: &mut dyn Write) -> Result<u64, CheckError> {
        let (n, _) = self.perform(url, Method::Get, &[], sink)?;
        tracing::trace!(url, bytes = n, "GET complete");
        Ok(n)
    }

    /// GET a small body fully into memory.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, CheckError> {
        let mut body = Vec::new();
        self.get_into(url, &mut body)?;
        Ok(body)
    }

    /// GET and decode a JSON body.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CheckError> {
        let body = self.get_bytes(url)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// POST a JSON document and decode the JSON response.
    pub fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T, CheckError> {
        let body = serde_json::to_vec(payload)?;
        let mut out = Vec::new();
        self.perform(
            url,
            Method::Post(&body),
            &[("Content-Type", "application/json")],
            &mut out,
        )?;
        Ok(serde_json::from_slice(&out)?)
    }
}
