//! ListObjectsV2 response parsing.
//!
//! Only the handful of elements the validators need are extracted: `Key`,
//! `Size` and `ETag` of each `Contents` entry, plus the continuation token.

use super::ObjectInfo;
use crate::error::CheckError;

pub(crate) struct ListPage {
    pub objects: Vec<ObjectInfo>,
    /// Set when the listing is truncated and another page must be fetched.
    pub next_token: Option<String>,
}

pub(crate) fn parse_list_page(xml: &str) -> Result<ListPage, CheckError> {
    if first(xml, "ListBucketResult").is_none() {
        return Err(CheckError::Decode(
            "listing response is not a ListBucketResult".to_string(),
        ));
    }

    let mut objects = Vec::new();
    for entry in elements(xml, "Contents") {
        let key = first(entry, "Key")
            .map(unescape)
            .ok_or_else(|| CheckError::Decode("listing entry without Key".to_string()))?;
        let size = first(entry, "Size")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| CheckError::Decode(format!("listing entry {} without Size", key)))?;
        let tag = first(entry, "ETag").map(|t| unescape(t).trim_matches('"').to_string());
        objects.push(ObjectInfo { key, size, tag });
    }

    let truncated = first(xml, "IsTruncated").map(str::trim) == Some("true");
    let next_token = if truncated {
        let token = first(xml, "NextContinuationToken")
            .map(unescape)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CheckError::Decode("truncated listing without NextContinuationToken".to_string())
            })?;
        Some(token)
    } else {
        None
    };

    Ok(ListPage {
        objects,
        next_token,
    })
}

/// Inner text of every `<tag>...</tag>` at any depth, in document order.
fn elements<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut out = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        let after = &rest[start + open.len()..];
        match after.find(&close) {
            Some(end) => {
                out.push(&after[..end]);
                rest = &after[end + close.len()..];
            }
            None => break,
        }
    }
    out
}

fn first<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    if let Some(inner) = elements(xml, tag).into_iter().next() {
        return Some(inner);
    }
    // Root elements usually carry an xmlns attribute.
    let open = format!("<{} ", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)?;
    let after = &xml[start..];
    let body_start = after.find('>')? + 1;
    let end = after.find(&close)?;
    after.get(body_start..end)
}

/// Decode the XML predefined entities and numeric character references.
/// Unknown or malformed references are kept as written.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').and_then(|end| Some((entity(&tail[1..end])?, end))) {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(name: &str) -> Option<char> {
    match name {
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
