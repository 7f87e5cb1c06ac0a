//! k-anonymity breach lookup.
//!
//! Only the first five hex characters of the password's SHA-1 hash leave the
//! process. The service answers with every known suffix under that prefix
//! and the match happens locally.

use crate::config::PolicyConfig;
use crate::error::{PolicyError, PolicyResult};
use async_trait::async_trait;
use reqwest::Client;
use sha1::{Digest, Sha1};
use std::time::Duration;
use tracing::{debug, warn};

/// Length of the hash prefix sent to the service.
pub const PREFIX_LEN: usize = 5;

/// Length of the suffix matched locally (SHA-1 is 40 hex characters).
pub const SUFFIX_LEN: usize = 35;

/// One line of a range response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreachEntry {
    /// Uppercase hex hash suffix.
    pub suffix: String,
    /// Number of times the password appeared in breach data.
    pub count: u64,
}

/// Splits the uppercase hex SHA-1 of `password` into `(prefix, suffix)`.
pub fn hash_prefix(password: &str) -> (String, String) {
    let mut digest = hex::encode_upper(Sha1::digest(password.as_bytes()));
    let suffix = digest.split_off(PREFIX_LEN);
    (digest, suffix)
}

/// Source of breach data keyed by hash prefix.
#[async_trait]
pub trait BreachLookup: Send + Sync {
    /// Every known suffix under `prefix`.
    async fn lookup_prefix(&self, prefix: &str) -> PolicyResult<Vec<BreachEntry>>;
}

/// Parses a range response body: one `SUFFIX:COUNT` per line.
///
/// Padding entries (count 0) are dropped.
pub fn parse_range_response(body: &str) -> PolicyResult<Vec<BreachEntry>> {
    let mut entries = Vec::new();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (suffix, count) = line
            .split_once(':')
            .ok_or_else(|| PolicyError::Protocol(format!("missing ':' in {line:?}")))?;
        if suffix.len() != SUFFIX_LEN || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PolicyError::Protocol(format!("bad suffix {suffix:?}")));
        }
        let count: u64 = count
            .trim()
            .parse()
            .map_err(|_| PolicyError::Protocol(format!("bad count in {line:?}")))?;
        if count > 0 {
            entries.push(BreachEntry {
                suffix: suffix.to_ascii_uppercase(),
                count,
            });
        }
    }
    Ok(entries)
}

/// How many times `password` appears in breach data.
///
/// Any lookup failure counts as zero: availability must not depend on the
/// breach service.
pub async fn breach_count<L: BreachLookup + ?Sized>(lookup: &L, password: &str) -> u64 {
    let (prefix, suffix) = hash_prefix(password);
    match lookup.lookup_prefix(&prefix).await {
        Ok(entries) => entries
            .iter()
            .find(|e| e.suffix == suffix)
            .map(|e| e.count)
            .unwrap_or(0),
        Err(e) => {
            warn!("breach lookup failed ({}), treating as not found", e.kind());
            0
        }
    }
}

/// HTTP client for the Pwned Passwords range API.
pub struct PwnedPasswordsClient {
    client: Client,
    config: PolicyConfig,
}

impl PwnedPasswordsClient {
    pub fn new(config: PolicyConfig) -> PolicyResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl BreachLookup for PwnedPasswordsClient {
    async fn lookup_prefix(&self, prefix: &str) -> PolicyResult<Vec<BreachEntry>> {
        if prefix.len() != PREFIX_LEN || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PolicyError::Protocol(format!("bad prefix {prefix:?}")));
        }
        let url = format!("{}/range/{prefix}", self.config.api_base_url);
        // The URL carries the prefix; keep it out of errors.
        let body = self
            .client
            .get(&url)
            .header("Add-Padding", "true")
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| PolicyError::Http(e.without_url()))?
            .text()
            .await
            .map_err(|e| PolicyError::Http(e.without_url()))?;
        let entries = parse_range_response(&body)?;
        debug!("range lookup returned {} entries", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_of_known_hash() {
        let (prefix, suffix) = hash_prefix("password");
        assert_eq!(prefix, "5BAA6");
        assert_eq!(suffix, "1E4C9B93F3F0682250B6CF8331B7EE68FD8");
    }

    #[test]
    fn parse_drops_padding_and_normalizes_case() {
        let body = "1e4c9b93f3f0682250b6cf8331b7ee68fd8:3\r\n\
                    0018A45C4D1DEF81644B54AB7F969B88D65:0\r\n";
        let entries = parse_range_response(body).unwrap();
        assert_eq!(
            entries,
            vec![BreachEntry {
                suffix: "1E4C9B93F3F0682250B6CF8331B7EE68FD8".to_string(),
                count: 3,
            }]
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_range_response("not a range body").is_err());
        assert!(parse_range_response("ABC:1").is_err());
        assert!(parse_range_response("1E4C9B93F3F0682250B6CF8331B7EE68FD8:many").is_err());
    }
}
