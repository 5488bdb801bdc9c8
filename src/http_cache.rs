use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};

// Process memory only; the feed is never written to disk.
static CACHE: Mutex<Option<HashMap<String, CacheEntry>>> = Mutex::new(None);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub body: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

/// GET `url` with conditional headers from the last successful response.
/// A 304 answers with the remembered body.
pub fn fetch_json_cached(client: &Client, url: &str) -> Result<String> {
    let cached_entry = cached(url);

    let mut req = client.get(url).header(ACCEPT, "application/json");
    if let Some(entry) = cached_entry.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let etag = header_text(resp.headers(), ETAG);
    let last_modified = header_text(resp.headers(), LAST_MODIFIED);
    let body = if status == StatusCode::NOT_MODIFIED {
        String::new()
    } else {
        resp.text().context("failed reading body")?
    };

    let (body, update) = resolve_response(cached_entry, status, body, etag, last_modified)?;
    match update {
        CacheUpdate::Keep => {}
        CacheUpdate::Store(entry) => store(url, entry),
        CacheUpdate::Forget => forget(url),
    }
    Ok(body)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheUpdate {
    Keep,
    Store(CacheEntry),
    /// A fresh body came back without validators; the old ones are stale.
    Forget,
}

/// Decides what a response means given the remembered entry. Returns the body
/// to use and what to do with the remembered entry.
pub fn resolve_response(
    cached_entry: Option<CacheEntry>,
    status: StatusCode,
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
) -> Result<(String, CacheUpdate)> {
    if status == StatusCode::NOT_MODIFIED {
        return match cached_entry {
            Some(entry) => Ok((entry.body, CacheUpdate::Keep)),
            None => Err(anyhow!("received 304 without cache body")),
        };
    }
    if !status.is_success() {
        return Err(anyhow!("http {}", status));
    }
    if etag.is_none() && last_modified.is_none() {
        let update = if cached_entry.is_some() {
            CacheUpdate::Forget
        } else {
            CacheUpdate::Keep
        };
        return Ok((body, update));
    }
    let entry = CacheEntry {
        body: body.clone(),
        etag,
        last_modified,
    };
    Ok((body, CacheUpdate::Store(entry)))
}

fn cached(url: &str) -> Option<CacheEntry> {
    let mut guard = CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    guard.get_or_insert_with(HashMap::new).get(url).cloned()
}

fn store(url: &str, entry: CacheEntry) {
    let mut guard = CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    guard
        .get_or_insert_with(HashMap::new)
        .insert(url.to_string(), entry);
}

fn forget(url: &str) {
    let mut guard = CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(cache) = guard.as_mut() {
        cache.remove(url);
    }
}

fn header_text(
    headers: &reqwest::header::HeaderMap,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(body: &str) -> CacheEntry {
        CacheEntry {
            body: body.to_string(),
            etag: Some("\"v1\"".to_string()),
            last_modified: None,
        }
    }

    #[test]
    fn not_modified_reuses_cached_body() {
        let (body, update) = resolve_response(
            Some(entry("[1]")),
            StatusCode::NOT_MODIFIED,
            String::new(),
            None,
            None,
        )
        .unwrap();
        assert_eq!(body, "[1]");
        assert_eq!(update, CacheUpdate::Keep);
    }

    #[test]
    fn not_modified_without_entry_is_error() {
        assert!(
            resolve_response(None, StatusCode::NOT_MODIFIED, String::new(), None, None).is_err()
        );
    }

    #[test]
    fn error_status_is_error() {
        let err = resolve_response(
            Some(entry("[1]")),
            StatusCode::NOT_FOUND,
            "missing".to_string(),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn validators_are_remembered() {
        let (body, update) = resolve_response(
            None,
            StatusCode::OK,
            "{}".to_string(),
            Some("\"v2\"".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(body, "{}");
        let CacheUpdate::Store(stored) = update else {
            panic!("expected a stored entry");
        };
        assert_eq!(stored.etag.as_deref(), Some("\"v2\""));

        let (_, update) =
            resolve_response(None, StatusCode::OK, "{}".to_string(), None, None).unwrap();
        assert_eq!(update, CacheUpdate::Keep);
    }

    #[test]
    fn fresh_body_without_validators_drops_old_entry() {
        let (body, update) = resolve_response(
            Some(entry("[1]")),
            StatusCode::OK,
            "[2]".to_string(),
            None,
            None,
        )
        .unwrap();
        assert_eq!(body, "[2]");
        assert_eq!(update, CacheUpdate::Forget);
    }
}
