//! Signature Version 4 request signing
//!
//! Implements the canonical-request / string-to-sign / derived-key scheme:
//!
//! ```text
//! kDate    = HMAC("AWS4" + secret, yyyymmdd)
//! kRegion  = HMAC(kDate, region)
//! kService = HMAC(kRegion, service)
//! kSigning = HMAC(kService, "aws4_request")
//! ```
//!
//! The signer is a pure function of the request parts, the credentials and
//! the timestamp, so it can be checked against published test vectors.

use std::collections::{BTreeMap, HashMap};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;
use crate::Result;
use crate::error::Error;
use super::credentials::AwsCredentials;

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Header carrying the request timestamp
pub const AMZ_DATE_HEADER: &str = "x-amz-date";

/// Header carrying the temporary session token
pub const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

/// Signs requests for one (credentials, region, service) triple.
pub struct Signer<'a> {
    credentials: &'a AwsCredentials,
    region: &'a str,
    service: &'a str,
}

/// Output of signing: the full header set to send.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    /// Lowercase header name -> value, including `authorization`.
    pub headers: BTreeMap<String, String>,
    /// Hex signature, for diagnostics.
    pub signature: String,
}

impl<'a> Signer<'a> {
    pub fn new(credentials: &'a AwsCredentials, region: &'a str, service: &'a str) -> Self {
        Self {
            credentials,
            region,
            service,
        }
    }

    /// Sign a request and return the headers it must carry.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &HashMap<String, String>,
        body: &[u8],
        time: DateTime<Utc>,
    ) -> Result<SignedHeaders> {
        let amz_date = time.format("%Y%m%dT%H%M%SZ").to_string();
        let date = time.format("%Y%m%d").to_string();

        let mut signed: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        signed.insert("host".to_string(), host_header(url)?);
        signed.insert(AMZ_DATE_HEADER.to_string(), amz_date.clone());
        if let Some(token) = &self.credentials.session_token {
            signed.insert(SECURITY_TOKEN_HEADER.to_string(), token.clone());
        }

        let (canonical, signed_header_names) = canonical_request(method, url, &signed, body);
        let scope = format!("{}/{}/{}/aws4_request", date, self.region, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical.as_bytes()))
        );

        let key = signing_key(&self.credentials.secret_access_key, &date, self.region, self.service)?;
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

        signed.insert(
            "authorization".to_string(),
            format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.credentials.access_key_id, scope, signed_header_names, signature
            ),
        );

        Ok(SignedHeaders {
            headers: signed,
            signature,
        })
    }
}

/// Build the canonical request and the `;`-joined signed header list.
///
/// `headers` must already be keyed by lowercase name.
pub fn canonical_request(
    method: &str,
    url: &Url,
    headers: &BTreeMap<String, String>,
    body: &[u8],
) -> (String, String) {
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, normalize_header_value(v)))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");

    let canonical = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        canonical_uri(url),
        canonical_query(url),
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(body))
    );

    (canonical, signed_headers)
}

/// Derive the request signing key.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::Auth(format!("Invalid signing key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::Transport(format!("URL has no host: {}", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// The path as sent, encoded once more (`%` becomes `%25`).
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        uri_encode(path, false)
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k, true), uri_encode(&v, true)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// RFC 3986 percent-encoding of everything but unreserved characters.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EXAMPLE_KEY: &str = "AKIDEXAMPLE";
    const EXAMPLE_SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn example_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    #[test]
    fn test_signing_key_derivation() {
        let key = signing_key(EXAMPLE_SECRET, "20120215", "us-east-1", "iam").unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_get_vanilla() {
        let creds = AwsCredentials::new(EXAMPLE_KEY, EXAMPLE_SECRET, None);
        let signer = Signer::new(&creds, "us-east-1", "service");
        let url = Url::parse("https://example.amazonaws.com/").unwrap();

        let signed = signer
            .sign("GET", &url, &HashMap::new(), b"", example_time())
            .unwrap();

        assert_eq!(
            signed.headers["authorization"],
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert_eq!(signed.headers["x-amz-date"], "20150830T123600Z");
        assert_eq!(signed.headers["host"], "example.amazonaws.com");
    }

    #[test]
    fn test_canonical_request_shape() {
        let url = Url::parse("https://example.amazonaws.com/").unwrap();
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "example.amazonaws.com".to_string());
        headers.insert("x-amz-date".to_string(), "20150830T123600Z".to_string());

        let (canonical, signed) = canonical_request("get", &url, &headers, b"");
        assert_eq!(signed, "host;x-amz-date");
        assert_eq!(
            canonical,
            "GET\n/\n\nhost:example.amazonaws.com\nx-amz-date:20150830T123600Z\n\nhost;x-amz-date\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_canonical_query_sorted_and_encoded() {
        let url = Url::parse("https://example.amazonaws.com/?b=2&a=x%20y&a=1").unwrap();
        assert_eq!(canonical_query(&url), "a=1&a=x%20y&b=2");
    }

    #[test]
    fn test_canonical_uri_double_encodes() {
        let url = Url::parse("https://example.amazonaws.com/sessions/a%20b/text").unwrap();
        assert_eq!(canonical_uri(&url), "/sessions/a%2520b/text");
    }

    #[test]
    fn test_session_token_is_signed() {
        let creds = AwsCredentials::new(EXAMPLE_KEY, EXAMPLE_SECRET, Some("TOKEN".to_string()));
        let signer = Signer::new(&creds, "us-west-2", "bedrock");
        let url = Url::parse("https://bedrock-agent-runtime.us-west-2.amazonaws.com/agents/A/text").unwrap();

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        let signed = signer
            .sign("POST", &url, &headers, br#"{"inputText":"hi"}"#, example_time())
            .unwrap();

        assert_eq!(signed.headers["x-amz-security-token"], "TOKEN");
        assert!(signed.headers["authorization"]
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let creds = AwsCredentials::new(EXAMPLE_KEY, EXAMPLE_SECRET, None);
        let signer = Signer::new(&creds, "us-west-2", "bedrock");
        let url = Url::parse("https://example.amazonaws.com:8443/x").unwrap();

        let first = signer.sign("POST", &url, &HashMap::new(), b"body", example_time()).unwrap();
        let second = signer.sign("POST", &url, &HashMap::new(), b"body", example_time()).unwrap();
        assert_eq!(first.signature, second.signature);
        assert_eq!(first.headers["host"], "example.amazonaws.com:8443");

        let other_body = signer.sign("POST", &url, &HashMap::new(), b"other", example_time()).unwrap();
        assert_ne!(first.signature, other_body.signature);
    }
}
