//! Password policy configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`PasswordPolicy`](crate::PasswordPolicy) and
/// [`PwnedPasswordsClient`](crate::PwnedPasswordsClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Base URL of the k-anonymity range API (e.g., "https://api.pwnedpasswords.com").
    pub api_base_url: String,

    /// Minimum password length in characters.
    pub min_length: usize,

    /// Timeout for a single range request (seconds).
    pub request_timeout_secs: u64,

    /// User-Agent header sent with range requests.
    pub user_agent: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.pwnedpasswords.com".to_string(),
            min_length: 8,
            request_timeout_secs: 5,
            user_agent: "notelock-policy".to_string(),
        }
    }
}
