//! Offline AWS Signature V4 query-string presigning.
//!
//! Produces the same presigned GET URLs an S3-compatible server would accept,
//! without contacting it. The only external input is the signing time, which
//! callers pass explicitly (see [`Clock`]).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use http::Method;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use url::Url;

/// Region every presigned URL is scoped to.
pub const SIGNING_REGION: &str = "us-east-1";

pub const SIGN_V4_ALGORITHM: &str = "AWS4-HMAC-SHA256";

const SERVICE_TYPE_S3: &str = "s3";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
const SIGNED_HEADERS: &str = "host";
const ISO8601_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const YYYYMMDD_FORMAT: &str = "%Y%m%d";

/// Everything except `A-Z a-z 0-9 - _ . ~` is percent-encoded.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Like [`QUERY_ENCODE_SET`] but keeps `/` so keys stay hierarchical.
const PATH_ENCODE_SET: &AsciiSet = &QUERY_ENCODE_SET.remove(b'/');

type HmacSha256 = Hmac<Sha256>;

/// Source of the signing timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Static credentials used for signing.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub session_token: Option<&'a str>,
}

/// Percent-encode an object key for use as a URL path.
pub fn encode_path(key: &str) -> String {
    utf8_percent_encode(key, PATH_ENCODE_SET).to_string()
}

/// Presign `url` for `method`, valid for `expires_secs` from `now`.
///
/// The returned URL carries the `X-Amz-*` query parameters with
/// `X-Amz-Signature` last. Any query already on `url` is kept and signed.
/// Empty credentials return `url` unchanged (anonymous access).
pub fn presign_v4(
    method: &Method,
    url: &Url,
    credentials: &Credentials<'_>,
    region: &str,
    expires_secs: u64,
    now: DateTime<Utc>,
) -> Url {
    if credentials.access_key.is_empty() || credentials.secret_key.is_empty() {
        return url.clone();
    }

    let amz_date = now.format(ISO8601_FORMAT).to_string();
    let scope = credential_scope(now, region);
    let credential = format!("{}/{}", credentials.access_key, scope);

    let mut params: Vec<(String, String)> = vec![
        ("X-Amz-Algorithm".to_string(), SIGN_V4_ALGORITHM.to_string()),
        ("X-Amz-Credential".to_string(), credential),
        ("X-Amz-Date".to_string(), amz_date.clone()),
        ("X-Amz-Expires".to_string(), expires_secs.to_string()),
        ("X-Amz-SignedHeaders".to_string(), SIGNED_HEADERS.to_string()),
    ];
    if let Some(token) = credentials.session_token.filter(|t| !t.is_empty()) {
        params.push(("X-Amz-Security-Token".to_string(), token.to_string()));
    }
    for (key, value) in url.query_pairs() {
        if !params.iter().any(|(existing, _)| *existing == key) {
            params.push((key.into_owned(), value.into_owned()));
        }
    }
    let canonical_query = canonical_query_string(params);

    let decoded_path = percent_decode_str(url.path()).decode_utf8_lossy();
    let canonical_path = if decoded_path.starts_with('/') {
        encode_path(&decoded_path)
    } else {
        format!("/{}", encode_path(&decoded_path))
    };

    let canonical_request = canonical_request(
        method,
        &canonical_path,
        &canonical_query,
        &canonical_host(url),
    );
    let string_to_sign = string_to_sign(&amz_date, &scope, &canonical_request);
    let key = signing_key(credentials.secret_key, now, region);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    let mut signed = url.clone();
    signed.set_path(&canonical_path);
    signed.set_query(Some(&format!(
        "{}&X-Amz-Signature={}",
        canonical_query, signature
    )));
    signed
}

fn credential_scope(now: DateTime<Utc>, region: &str) -> String {
    format!(
        "{}/{}/{}/aws4_request",
        now.format(YYYYMMDD_FORMAT),
        region,
        SERVICE_TYPE_S3
    )
}

fn canonical_query_string(mut params: Vec<(String, String)>) -> String {
    // Stable sort: repeated keys keep their relative order.
    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_ENCODE_SET),
                utf8_percent_encode(value, QUERY_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Host as sent in the `Host` header: default ports are omitted.
fn canonical_host(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

fn canonical_request(method: &Method, path: &str, query: &str, host: &str) -> String {
    [
        method.as_str(),
        path,
        query,
        format!("host:{}\n", host).as_str(),
        SIGNED_HEADERS,
        UNSIGNED_PAYLOAD,
    ]
    .join("\n")
}

fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    let hashed = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    format!("{}\n{}\n{}\n{}", SIGN_V4_ALGORITHM, amz_date, scope, hashed)
}

fn signing_key(secret_key: &str, now: DateTime<Utc>, region: &str) -> Vec<u8> {
    let date = now.format(YYYYMMDD_FORMAT).to_string();
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, SERVICE_TYPE_S3.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
