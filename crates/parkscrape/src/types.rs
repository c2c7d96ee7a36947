use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Invalid field '{0}'. Accepted values: 'id', 'title', 'company', 'email', 'url'")]
pub struct FieldParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Title,
    Company,
    Email,
    Url,
}

impl FromStr for Field {
    type Err = FieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(Field::Id),
            "title" => Ok(Field::Title),
            "company" => Ok(Field::Company),
            "email" => Ok(Field::Email),
            "url" | "link" => Ok(Field::Url),
            _ => Err(FieldParseError(s.to_string())),
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Id => write!(f, "id"),
            Field::Title => write!(f, "title"),
            Field::Company => write!(f, "company"),
            Field::Email => write!(f, "email"),
            Field::Url => write!(f, "url"),
        }
    }
}

/// One extracted row. Empty strings stand for fields the page did not have.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: Option<u32>,
    pub title: String,
    pub company: String,
    pub email: String,
    pub url: String,
}

impl Record {
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Id => self.id.is_some(),
            other => self.text(other).is_some_and(|v| !v.is_empty()),
        }
    }

    /// Text value of a string field; `None` for [`Field::Id`].
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Id => None,
            Field::Title => Some(&self.title),
            Field::Company => Some(&self.company),
            Field::Email => Some(&self.email),
            Field::Url => Some(&self.url),
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = self.id {
            write!(f, "{}: ", id)?;
        }
        if !self.title.is_empty() {
            write!(f, "{} | ", self.title)?;
        }
        write!(f, "{} | {} | {}", self.company, self.email, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub field: Field,
    pub header: String,
}

impl Column {
    pub fn new(field: Field, header: impl Into<String>) -> Self {
        Self {
            field,
            header: header.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Transport(String),
    Status(u16),
    Unparseable(String),
    MissingField(Field),
    NoKeywordMatch,
}

impl SkipReason {
    /// Short label used to group skips in the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::Transport(_) => "transport error",
            SkipReason::Status(_) => "non-200 status",
            SkipReason::Unparseable(_) => "unparseable body",
            SkipReason::MissingField(_) => "missing field",
            SkipReason::NoKeywordMatch => "no keyword match",
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Transport(e) => write!(f, "transport error: {}", e),
            SkipReason::Status(code) => write!(f, "HTTP status {}", code),
            SkipReason::Unparseable(e) => write!(f, "unparseable body: {}", e),
            SkipReason::MissingField(field) => write!(f, "{} not found", field),
            SkipReason::NoKeywordMatch => write!(f, "title matches no keyword"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub url: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(Record),
    Skipped(Skipped),
}

impl Outcome {
    pub fn skipped(url: impl Into<String>, reason: SkipReason) -> Self {
        Outcome::Skipped(Skipped {
            url: url.into(),
            reason,
        })
    }
}

/// Everything one target run produced, in visiting order.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub target: String,
    pub records: Vec<Record>,
    pub skipped: Vec<Skipped>,
    pub pages_fetched: usize,
}

impl ScrapeReport {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success(record) => self.records.push(record),
            Outcome::Skipped(skipped) => self.skipped.push(skipped),
        }
    }

    pub fn skip_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for skipped in &self.skipped {
            *counts.entry(skipped.reason.kind()).or_insert(0) += 1;
        }
        counts
    }
}

impl Display for ScrapeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nSummary for {}:", self.target)?;
        writeln!(f, "  Pages fetched: {:>6}", self.pages_fetched)?;
        writeln!(f, "  Records:       {:>6}", self.records.len())?;
        writeln!(f, "  Skipped:       {:>6}", self.skipped.len())?;
        for (kind, count) in self.skip_counts() {
            writeln!(f, "    {:<18} {:>4}", kind, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_has_treats_empty_as_absent() {
        let record = Record {
            id: Some(7),
            company: "Acme".to_string(),
            ..Default::default()
        };

        assert!(record.has(Field::Id));
        assert!(record.has(Field::Company));
        assert!(!record.has(Field::Email));
        assert!(!record.has(Field::Title));
    }

    #[test]
    fn test_report_groups_skips_by_kind() {
        let mut report = ScrapeReport::new("demo");
        report.push(Outcome::skipped("a", SkipReason::Status(404)));
        report.push(Outcome::skipped("b", SkipReason::Status(500)));
        report.push(Outcome::skipped("c", SkipReason::MissingField(Field::Email)));
        report.push(Outcome::Success(Record::default()));

        let counts = report.skip_counts();
        assert_eq!(counts.get("non-200 status"), Some(&2));
        assert_eq!(counts.get("missing field"), Some(&1));
        assert_eq!(report.records.len(), 1);

        let summary = report.to_string();
        assert!(summary.contains("Summary for demo"));
    }

    #[test]
    fn test_field_from_str_accepts_link_alias() {
        assert_eq!("link".parse::<Field>().unwrap(), Field::Url);
        assert!("phone".parse::<Field>().is_err());
    }
}
