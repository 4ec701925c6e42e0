//! License expressions.
//!
//! Uses the `spdx` crate in lax mode, so common non-standard spellings such as
//! "Apache2" or "MIT/X11" still count as valid expressions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel values that mean "no license information"
const UNKNOWN_MARKERS: &[&str] = &["NOASSERTION", "NONE", "UNKNOWN"];

/// License expression following SPDX license expression syntax
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LicenseExpression {
    /// The raw license expression string
    pub expression: String,
    /// Whether this is a valid SPDX expression
    pub is_valid_spdx: bool,
}

impl LicenseExpression {
    /// Create a new license expression
    pub fn new(expression: impl Into<String>) -> Self {
        let expression = expression.into();
        let is_valid_spdx = Self::validate_spdx(&expression);
        Self {
            expression,
            is_valid_spdx,
        }
    }

    /// Parse an optional raw value, mapping sentinels such as `NOASSERTION` to `None`.
    #[must_use]
    pub fn from_declared(value: Option<&str>) -> Option<Self> {
        let value = value?.trim();
        if value.is_empty() || Self::is_marker(value) {
            None
        } else {
            Some(Self::new(value))
        }
    }

    /// Whether the expression carries no actual license information.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        let trimmed = self.expression.trim();
        trimmed.is_empty() || Self::is_marker(trimmed)
    }

    fn is_marker(value: &str) -> bool {
        UNKNOWN_MARKERS
            .iter()
            .any(|m| m.eq_ignore_ascii_case(value))
    }

    fn validate_spdx(expr: &str) -> bool {
        if expr.trim().is_empty() || Self::is_marker(expr.trim()) {
            return false;
        }
        spdx::Expression::parse_mode(expr, spdx::ParseMode::LAX).is_ok()
    }
}

impl fmt::Display for LicenseExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}
