//! Password policy for notelock.
//!
//! Two independent checks:
//! - [`strength`]: a local length and character-class heuristic
//! - [`PasswordPolicy::validate`]: minimum length plus a k-anonymity breach
//!   lookup, where only a 5-character hash prefix leaves the process
//!
//! The breach check is advisory. Network and protocol failures are logged
//! and treated as "not found".

mod breach;
mod config;
mod error;
mod password;

pub use breach::{
    BreachEntry, BreachLookup, PREFIX_LEN, PwnedPasswordsClient, SUFFIX_LEN, breach_count,
    hash_prefix, parse_range_response,
};
pub use config::PolicyConfig;
pub use error::{PolicyError, PolicyResult};
pub use password::{
    MAX_STRENGTH_SCORE, PasswordPolicy, PasswordStrength, PasswordValidation, StrengthLevel,
    ValidationIssue, strength,
};
