//! Generation options.

use serde::{Deserialize, Serialize};

/// What a stub method returns once its queued results are used up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExhaustedPolicy {
    /// Keep returning the last queued tuple.
    #[default]
    RepeatLast,
    /// Return zero values.
    ZeroValue,
}

/// Options for [`generate_stub`](crate::generate_stub).
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```toml
/// format = false
/// exhausted = "zero-value"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubOptions {
    /// Reparse and canonically reprint the generated source.
    pub format: bool,
    pub exhausted: ExhaustedPolicy,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            format: true,
            exhausted: ExhaustedPolicy::RepeatLast,
        }
    }
}
