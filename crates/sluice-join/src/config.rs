//! Joiner configuration.

use serde::{Deserialize, Serialize};

/// Packet Joiner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinerConfig {
    /// Capture time a query waits for its response (seconds).
    pub timeout_secs: u64,

    /// Pass ICMP packets through to the output.
    pub icmp: bool,
}

impl Default for JoinerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 2,
            icmp: true,
        }
    }
}

impl JoinerConfig {
    /// Validates value ranges, returning the offending field and reason.
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if self.timeout_secs == 0 {
            return Err(("joiner.timeout_secs", "must be greater than zero".into()));
        }
        Ok(())
    }
}
