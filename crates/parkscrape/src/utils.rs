use crate::target::{ScrapeTarget, Strategy};

/// Command-line adjustments applied on top of every selected target.
#[derive(Debug, Default)]
pub struct TargetOverrides {
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub max_pages: Option<u32>,
    pub insecure: bool,
    pub start: Option<u32>,
    pub end: Option<u32>,
    pub keywords: Vec<String>,
}

impl TargetOverrides {
    pub fn validate(self) -> Result<Self, String> {
        if let Some(start) = self.start
            && let Some(end) = self.end
            && start > end
        {
            return Err(format!("Start ID ({start}) cannot be after end ID ({end})"));
        }
        if self.max_pages.is_some_and(|m| m == 0) {
            return Err("Max pages must be greater than 0".to_string());
        }
        if self.timeout_secs.is_some_and(|t| t == 0) {
            return Err("Timeout must be greater than 0".to_string());
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err("Keywords cannot be blank".to_string());
        }
        Ok(self)
    }

    pub fn apply(&self, target: &mut ScrapeTarget) {
        if let Some(delay) = self.delay_ms {
            target.delay_ms = delay;
        }
        if let Some(timeout) = self.timeout_secs {
            target.client.timeout_secs = Some(timeout);
        }
        if self.insecure {
            target.client.accept_invalid_certs = true;
        }

        match &mut target.strategy {
            Strategy::IdRange { start, end, .. } => {
                if let Some(s) = self.start {
                    *start = s;
                }
                if let Some(e) = self.end {
                    *end = e;
                }
            }
            Strategy::KeywordSearch {
                keywords,
                max_pages,
                ..
            } => {
                if !self.keywords.is_empty() {
                    *keywords = self.keywords.clone();
                }
                if self.max_pages.is_some() {
                    *max_pages = self.max_pages;
                }
            }
        }
    }
}
