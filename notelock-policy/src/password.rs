//! Password validation and the local strength heuristic.

use crate::breach::{BreachLookup, breach_count};
use crate::config::PolicyConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A single reason a password was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ValidationIssue {
    TooShort { min: usize },
    Breached { occurrences: u64 },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::TooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            ValidationIssue::Breached { occurrences } => write!(
                f,
                "password appears in {occurrences} known data breach(es)"
            ),
        }
    }
}

/// Outcome of [`PasswordPolicy::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordValidation {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

/// Coarse strength bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrengthLevel {
    Weak,
    Fair,
    Good,
    Strong,
}

/// Outcome of [`strength`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordStrength {
    pub level: StrengthLevel,
    /// 0 to [`MAX_STRENGTH_SCORE`].
    pub score: u8,
}

pub const MAX_STRENGTH_SCORE: u8 = 7;

/// Scores `password` by length and character-class coverage. Purely local.
///
/// One point each for reaching 8, 12 and 16 characters, and one point each
/// for containing a lowercase letter, an uppercase letter, a digit, and
/// anything else.
pub fn strength(password: &str) -> PasswordStrength {
    let len = password.chars().count();
    let length_points = [8, 12, 16].iter().filter(|&&n| len >= n).count();

    let classes = [
        password.chars().any(|c| c.is_lowercase()),
        password.chars().any(|c| c.is_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password
            .chars()
            .any(|c| !c.is_lowercase() && !c.is_uppercase() && !c.is_ascii_digit()),
    ];
    let class_points = classes.iter().filter(|&&present| present).count();

    let score = (length_points + class_points) as u8;
    let level = match score {
        0..=2 => StrengthLevel::Weak,
        3..=4 => StrengthLevel::Fair,
        5..=6 => StrengthLevel::Good,
        _ => StrengthLevel::Strong,
    };
    PasswordStrength { level, score }
}

/// Minimum length plus breach check.
pub struct PasswordPolicy<L> {
    config: PolicyConfig,
    lookup: L,
}

impl<L: BreachLookup> PasswordPolicy<L> {
    pub fn new(config: PolicyConfig, lookup: L) -> Self {
        Self { config, lookup }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Checks the length rule and the breach service. A breach service
    /// failure never makes a password invalid.
    pub async fn validate(&self, password: &str) -> PasswordValidation {
        let mut errors = Vec::new();

        let min = self.config.min_length;
        if password.chars().count() < min {
            errors.push(ValidationIssue::TooShort { min });
        }

        let occurrences = breach_count(&self.lookup, password).await;
        if occurrences > 0 {
            errors.push(ValidationIssue::Breached { occurrences });
        }

        debug!("password validation: {} issue(s)", errors.len());
        PasswordValidation {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Same as the free [`strength`] function.
    pub fn strength(&self, password: &str) -> PasswordStrength {
        strength(password)
    }
}
