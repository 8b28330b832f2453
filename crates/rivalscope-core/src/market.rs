//! The market allow-list.

use serde::{Deserialize, Serialize};

/// Market codes eligible for filtering and aggregation, in display order.
pub const DEFAULT_MARKETS: [&str; 8] = ["fi", "no", "dk", "se", "de", "fr", "it", "es"];

/// Lowercase two-letter market codes. Values outside the list are ignored by
/// callers, never rejected with an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketAllowList {
    codes: Vec<String>,
}

impl MarketAllowList {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for code in codes {
            let code = code.as_ref().trim().to_lowercase();
            if !code.is_empty() && !out.contains(&code) {
                out.push(code);
            }
        }
        Self { codes: out }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }

    /// Trim and lowercase `raw`; `None` when empty or not allow-listed.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let code = raw.trim().to_lowercase();
        if self.contains(&code) {
            Some(code)
        } else {
            None
        }
    }
}

impl Default for MarketAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_MARKETS)
    }
}
