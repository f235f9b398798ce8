//! Turning mesh source identifiers into bytes
use base64::Engine;

use crate::error::LoadError;

/// Resolves a source identifier (URL, data URL or path) to raw bytes
pub trait SourceFetcher: Send + Sync {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, LoadError>;
}

/// Fetcher for `data:` URLs, `file://` URLs and plain paths, plus
/// `http(s)://` URLs when built with the `http` feature.
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher {
    #[cfg(feature = "http")]
    http: reqwest::blocking::Client,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "http")]
    fn fetch_http(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let fail = |reason: String| LoadError::Fetch {
            source_id: url.to_string(),
            reason,
        };
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| fail(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(fail(format!("status {}", response.status())));
        }
        let body = response
            .bytes()
            .map_err(|e| fail(format!("reading body failed: {e}")))?;
        Ok(body.to_vec())
    }

    #[cfg(not(feature = "http"))]
    fn fetch_http(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        Err(LoadError::Unsupported(format!(
            "{url}: remote sources need the `http` feature"
        )))
    }
}

impl SourceFetcher for DefaultFetcher {
    fn fetch(&self, source_id: &str) -> Result<Vec<u8>, LoadError> {
        let lower = source_id.get(..8).unwrap_or(source_id).to_ascii_lowercase();
        if lower.starts_with("data:") {
            decode_data_url(source_id)
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            self.fetch_http(source_id)
        } else if lower.starts_with("file://") {
            read_file(&source_id[7..])
        } else if let Some((scheme, _)) = source_id.split_once("://") {
            Err(LoadError::Unsupported(format!("{scheme}:// URLs")))
        } else {
            read_file(source_id)
        }
    }
}

fn read_file(path: &str) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|e| LoadError::Fetch {
        source_id: path.to_string(),
        reason: e.to_string(),
    })
}

/// Decode `data:[<mediatype>][;base64],<payload>`
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, LoadError> {
    let rest = url
        .get(5..)
        .ok_or_else(|| LoadError::InvalidDataUrl("missing data: prefix".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| LoadError::InvalidDataUrl("missing ',' separator".into()))?;
    let is_base64 = meta
        .split(';')
        .any(|part| part.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
    } else {
        percent_decode(payload)
    }
}

fn percent_decode(s: &str) -> Result<Vec<u8>, LoadError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| LoadError::InvalidDataUrl(format!("bad escape at offset {i}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}
