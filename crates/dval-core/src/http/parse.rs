//! Parse HTTP response header lines into HeadResult.

/// Metadata from a HEAD response, as needed by the object store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// `ETag` value without surrounding quotes.
    pub etag: Option<String>,
    /// `Last-Modified` value if present.
    pub last_modified: Option<String>,
}

/// Status code from a status line such as `HTTP/1.1 404 Not Found` or `HTTP/2 200`.
pub fn status_code(line: &str) -> Option<u32> {
    let line = line.trim();
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Parse collected header lines into HeadResult.
pub fn parse_headers(lines: &[String]) -> HeadResult {
    let mut out = HeadResult::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    out.content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("etag") {
                out.etag = Some(value.trim_matches('"').to_string());
            }
            if name.eq_ignore_ascii_case("last-modified") {
                out.last_modified = Some(value.to_string());
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_headers_content_length_and_etag() {
        let lines = [
            "HTTP/1.1 200 OK".to_string(),
            "Content-Length: 12345".to_string(),
            "ETag: \"9b2cf535f27731c974343645a3985328\"".to_string(),
        ];
        let r = parse_headers(&lines);
        assert_eq!(r.content_length, Some(12345));
        assert_eq!(r.etag.as_deref(), Some("9b2cf535f27731c974343645a3985328"));
        assert!(r.last_modified.is_none());
    }

    #[test]
    fn parse_headers_multipart_etag_and_last_modified() {
        let lines = [
            "etag: \"d41d8cd98f00b204e9800998ecf8427e-12\"".to_string(),
            "Last-Modified: Wed, 21 Oct 2015 07:28:00 GMT".to_string(),
        ];
        let r = parse_headers(&lines);
        assert_eq!(r.etag.as_deref(), Some("d41d8cd98f00b204e9800998ecf8427e-12"));
        assert_eq!(
            r.last_modified.as_deref(),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
    }

    #[test]
    fn parse_headers_ignores_garbage() {
        let lines = ["Content-Length: lots".to_string(), "no colon".to_string()];
        let r = parse_headers(&lines);
        assert_eq!(r, HeadResult::default());
    }

    #[test]
    fn status_lines() {
        assert_eq!(status_code("HTTP/1.1 404 Not Found\r\n"), Some(404));
        assert_eq!(status_code("HTTP/2 200"), Some(200));
        assert_eq!(status_code("Content-Length: 5"), None);
    }
}
