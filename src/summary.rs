use std::fmt;

use crate::probe::ProbeResults;

/// Final verdict of a run, derived from the purge outcome and the probe results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub cache_purged: bool,
    pub successful_urls: Vec<String>,
    pub probed: usize,
}

impl Summary {
    pub fn new(cache_purged: bool, probes: &ProbeResults) -> Self {
        Self {
            cache_purged,
            successful_urls: probes.successful_urls().into_iter().map(str::to_string).collect(),
            probed: probes.len(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.cache_purged && !self.successful_urls.is_empty()
    }

    pub fn exit_status(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "VERIFICATION SUMMARY")?;
        writeln!(f, "{}", "=".repeat(40))?;
        writeln!(f, "Cache Purged: {}", if self.cache_purged { "YES" } else { "NO" })?;
        writeln!(f, "Working URLs: {}/{}", self.successful_urls.len(), self.probed)?;
        for url in &self.successful_urls {
            writeln!(f, "  SUCCESS: {}", url)?;
        }
        writeln!(f)?;
        if self.is_success() {
            write!(f, "SUCCESS: Cache purged and domain is accessible!")
        } else {
            write!(f, "ISSUES DETECTED: Manual investigation required")
        }
    }
}
