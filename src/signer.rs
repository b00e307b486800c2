//! Per-request signing for the source API
//!
//! The pipeline only needs a set of headers for a (method, URL) pair. The
//! [`SigV4Signer`] produces them with AWS Signature Version 4.

use hmac::{Hmac, Mac};
use reqwest::{Method, Url};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use time::macros::format_description;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_HOST: &str = "Host";
pub const HEADER_DATE: &str = "X-Amz-Date";
pub const HEADER_SECURITY_TOKEN: &str = "X-Amz-Security-Token";

#[derive(Debug, Error)]
pub enum SignError {
    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Timestamp formatting failed: {0}")]
    Timestamp(#[from] time::error::Format),
}

pub type Result<T> = std::result::Result<T, SignError>;

/// Header name/value pairs to attach to a request
pub type SignedHeaders = Vec<(String, String)>;

/// Signs outgoing source API requests
pub trait RequestSigner: Send + Sync {
    fn sign(&self, method: &Method, url: &Url) -> Result<SignedHeaders>;
}

/// Static AWS credentials
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// AWS Signature Version 4 signer for one service/region
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: Credentials,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(credentials: Credentials, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Sign as of an explicit instant
    pub fn sign_at(&self, method: &Method, url: &Url, at: OffsetDateTime) -> Result<SignedHeaders> {
        let host = host_header(url)?;
        let amz_date = at.format(format_description!(
            "[year][month][day]T[hour][minute][second]Z"
        ))?;
        let date = &amz_date[..8];

        let mut canonical_headers = format!("host:{}\nx-amz-date:{}\n", host, amz_date);
        let mut signed_headers = String::from("host;x-amz-date");
        if let Some(token) = &self.credentials.session_token {
            canonical_headers.push_str(&format!("x-amz-security-token:{}\n", token));
            signed_headers.push_str(";x-amz-security-token");
        }

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method.as_str(),
            canonical_uri(url),
            canonical_query(url),
            canonical_headers,
            signed_headers,
            hex::encode(Sha256::digest(b""))
        );

        let scope = format!("{}/{}/{}/aws4_request", date, self.region, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = signing_key(
            &self.credentials.secret_access_key,
            date,
            &self.region,
            &self.service,
        )?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.credentials.access_key_id, scope, signed_headers, signature
        );

        let mut headers = vec![
            (HEADER_AUTHORIZATION.to_string(), authorization),
            (HEADER_HOST.to_string(), host),
            (HEADER_DATE.to_string(), amz_date),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push((HEADER_SECURITY_TOKEN.to_string(), token.clone()));
        }

        Ok(headers)
    }
}

impl RequestSigner for SigV4Signer {
    fn sign(&self, method: &Method, url: &Url) -> Result<SignedHeaders> {
        self.sign_at(method, url, OffsetDateTime::now_utc())
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set
pub fn uri_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Build a query string whose encoding is already canonical
pub fn encode_query<K: AsRef<str>, V: AsRef<str>>(params: &[(K, V)]) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={}", uri_encode(name.as_ref()), uri_encode(value.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| SignError::MissingHost(url.to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

// Non-S3 services encode each path segment twice; `Url::path` is already the first pass.
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn canonical_query(url: &Url) -> String {
    let Some(query) = url.query() else {
        return String::new();
    };

    let mut pairs: Vec<(&str, &str)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect();
    pairs.sort_unstable();

    pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| SignError::InvalidKey(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
