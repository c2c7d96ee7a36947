//! Target definitions: how a site's candidate URLs are enumerated, which
//! elements carry each field, and when an extracted record counts.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use url::{Url, form_urlencoded};

use crate::parser::{PageExtractor, ParseError, RowExtractor};
use crate::types::{Column, Field};

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("Failed to read target file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid target definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown target '{0}'")]
    UnknownTarget(String),
    #[error("Target '{0}' was requested more than once")]
    DuplicateTarget(String),
    #[error("Target '{name}': start ID {start} is after end ID {end}")]
    InvalidRange { name: String, start: u32, end: u32 },
    #[error("Target '{name}': {reason}")]
    Invalid { name: String, reason: String },
    #[error("Target '{name}': {source}")]
    Selector {
        name: String,
        #[source]
        source: ParseError,
    },
}

/// How the matched elements of a rule become a single value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pick {
    First,
    Last,
    FirstContaining { needle: String },
    LastContaining { needle: String },
    /// Last `href` starting with `mailto:`, without the scheme.
    Mailto,
    Attr { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub selector: String,
    pub pick: Pick,
}

impl FieldRule {
    pub fn new(selector: impl Into<String>, pick: Pick) -> Self {
        Self {
            selector: selector.into(),
            pick,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<FieldRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<FieldRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<FieldRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Strategy {
    /// One page per numeric ID: `url_prefix + id` for `start..=end`.
    IdRange {
        url_prefix: String,
        start: u32,
        end: u32,
        fields: FieldRules,
    },
    /// Paged search per keyword. `search_url` carries `{keyword}` and `{page}`
    /// placeholders; each matching row is followed to its detail page, resolved
    /// against the search page it was listed on.
    KeywordSearch {
        search_url: String,
        keywords: Vec<String>,
        row_selector: String,
        link: FieldRule,
        fields: FieldRules,
        #[serde(default)]
        detail: FieldRules,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_pages: Option<u32>,
    },
}

impl Strategy {
    /// Fills the placeholders; the keyword is form-encoded so reserved characters
    /// stay inside its query value.
    pub fn search_page_url(search_url: &str, keyword: &str, page: u32) -> String {
        let keyword: String = form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
        search_url
            .replace("{keyword}", &keyword)
            .replace("{page}", &page.to_string())
    }

    pub fn detail_url(page_url: &str, link: &str) -> Result<String, url::ParseError> {
        Ok(Url::parse(page_url)?.join(link)?.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Per-request timeout; unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Skips TLS certificate validation. Off unless explicitly requested.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// File name without extension; the export format decides the extension.
    pub file_stem: String,
    pub sheet: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTarget {
    pub name: String,
    #[serde(flatten)]
    pub strategy: Strategy,
    #[serde(default)]
    pub client: ClientConfig,
    pub delay_ms: u64,
    /// Fields that must be non-empty (after fallbacks) for a record to be kept.
    #[serde(default)]
    pub required: Vec<Field>,
    /// When non-empty, the title must contain one of these (case-insensitive).
    #[serde(default)]
    pub title_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_fallback: Option<String>,
    /// Used when no company was found; `{id}` is replaced with the page ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_fallback: Option<String>,
    pub output: OutputSpec,
}

impl ScrapeTarget {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Checks ranges, output settings and every rule without touching the network,
    /// so a bad definition fails before the first request instead of at export.
    pub fn validate(&self) -> Result<(), TargetError> {
        let invalid = |reason: String| TargetError::Invalid {
            name: self.name.clone(),
            reason,
        };
        let selector_err = |source| TargetError::Selector {
            name: self.name.clone(),
            source,
        };

        self.output.check().map_err(invalid)?;

        match &self.strategy {
            Strategy::IdRange {
                start, end, fields, ..
            } => {
                if start > end {
                    return Err(TargetError::InvalidRange {
                        name: self.name.clone(),
                        start: *start,
                        end: *end,
                    });
                }
                fields.check().map_err(invalid)?;
                PageExtractor::compile(fields).map_err(selector_err)?;
            }
            Strategy::KeywordSearch {
                search_url,
                keywords,
                row_selector,
                link,
                fields,
                detail,
                max_pages,
            } => {
                if !search_url.contains("{page}") {
                    return Err(invalid("search_url has no {page} placeholder".to_string()));
                }
                let first_page = Strategy::search_page_url(search_url, "keyword", 1);
                if let Err(e) = Url::parse(&first_page) {
                    return Err(invalid(format!("search_url is not a valid URL: {e}")));
                }
                if keywords.iter().any(|k| k.trim().is_empty()) {
                    return Err(invalid("keywords cannot be blank".to_string()));
                }
                if *max_pages == Some(0) {
                    return Err(invalid("max_pages must be greater than 0".to_string()));
                }
                link.check().map_err(invalid)?;
                fields.check().map_err(invalid)?;
                detail.check().map_err(invalid)?;
                RowExtractor::compile(row_selector, link, fields).map_err(selector_err)?;
                PageExtractor::compile(detail).map_err(selector_err)?;
            }
        }

        Ok(())
    }
}

impl FieldRule {
    fn check(&self) -> Result<(), String> {
        match &self.pick {
            Pick::FirstContaining { needle } | Pick::LastContaining { needle }
                if needle.is_empty() =>
            {
                Err(format!("rule '{}' has an empty needle", self.selector))
            }
            Pick::Attr { name } if name.trim().is_empty() => {
                Err(format!("rule '{}' has an empty attribute name", self.selector))
            }
            _ => Ok(()),
        }
    }
}

impl FieldRules {
    fn check(&self) -> Result<(), String> {
        [&self.title, &self.company, &self.email]
            .into_iter()
            .flatten()
            .try_for_each(FieldRule::check)
    }
}

/// Characters a spreadsheet sheet name may not contain.
const SHEET_NAME_FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

impl OutputSpec {
    fn check(&self) -> Result<(), String> {
        if self.columns.is_empty() {
            return Err("output has no columns".to_string());
        }

        let stem = self.file_stem.trim();
        if stem.is_empty() || stem == "." || stem == ".." || stem.contains(['/', '\\']) {
            return Err(format!(
                "file_stem '{}' must be a plain file name",
                self.file_stem
            ));
        }

        let sheet = &self.sheet;
        let len = sheet.chars().count();
        if !(1..=31).contains(&len) {
            return Err(format!("sheet name '{sheet}' must be 1 to 31 characters"));
        }
        if sheet.chars().any(|c| SHEET_NAME_FORBIDDEN.contains(&c)) {
            return Err(format!(
                "sheet name '{sheet}' cannot contain any of [ ] : * ? / \\"
            ));
        }
        if sheet.starts_with('\'') || sheet.ends_with('\'') {
            return Err(format!(
                "sheet name '{sheet}' cannot start or end with an apostrophe"
            ));
        }
        Ok(())
    }
}

pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<ScrapeTarget>, TargetError> {
    let text = fs::read_to_string(path)?;
    let targets: Vec<ScrapeTarget> = serde_json::from_str(&text)?;
    Ok(targets)
}

/// Picks targets by name, keeping the order of `names`. No names selects everything;
/// a name given twice is rejected, since both runs would write the same file.
pub fn select_targets(
    targets: Vec<ScrapeTarget>,
    names: &[String],
) -> Result<Vec<ScrapeTarget>, TargetError> {
    if names.is_empty() {
        return Ok(targets);
    }

    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(TargetError::DuplicateTarget(name.clone()));
        }
    }

    names
        .iter()
        .map(|name| {
            targets
                .iter()
                .find(|t| &t.name == name)
                .cloned()
                .ok_or_else(|| TargetError::UnknownTarget(name.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;
    use std::io::Write;

    #[test]
    fn test_search_page_url_replaces_spaces() {
        let url = Strategy::search_page_url(
            "https://infopark.in/companies/job-search?search={keyword}&page={page}",
            "full stack",
            3,
        );
        assert_eq!(
            url,
            "https://infopark.in/companies/job-search?search=full+stack&page=3"
        );
    }

    fn query_pairs(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .expect("Invalid URL")
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    const INFOPARK_SEARCH: &str =
        "https://infopark.in/companies/job-search?search={keyword}&page={page}";

    #[test]
    fn test_search_page_url_keeps_hash_inside_keyword() {
        let url = Strategy::search_page_url(INFOPARK_SEARCH, "c#", 2);

        assert_eq!(
            query_pairs(&url),
            vec![
                ("search".to_string(), "c#".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
        assert!(Url::parse(&url).unwrap().fragment().is_none());
    }

    #[test]
    fn test_search_page_url_encodes_plus_and_ampersand() {
        let url = Strategy::search_page_url(INFOPARK_SEARCH, "c++ & rust", 1);

        assert_eq!(
            query_pairs(&url),
            vec![
                ("search".to_string(), "c++ & rust".to_string()),
                ("page".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_detail_url_resolves_against_search_page() {
        let page = "https://infopark.in/companies/job-search?search=python&page=1";

        assert_eq!(
            Strategy::detail_url(page, "/job-details/12").unwrap(),
            "https://infopark.in/job-details/12"
        );
        assert_eq!(
            Strategy::detail_url(page, "job-details/12").unwrap(),
            "https://infopark.in/companies/job-details/12"
        );
        assert_eq!(
            Strategy::detail_url(page, "https://other.example/x").unwrap(),
            "https://other.example/x"
        );
        assert!(Strategy::detail_url(page, "https://[bad").is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut target = presets::infopark_companies();
        if let Strategy::IdRange { start, end, .. } = &mut target.strategy {
            *start = 10;
            *end = 5;
        }

        let err = target.validate().unwrap_err();
        assert!(matches!(err, TargetError::InvalidRange { start: 10, end: 5, .. }));
    }

    #[test]
    fn test_validate_rejects_bad_selector() {
        let mut target = presets::technopark_companies();
        if let Strategy::IdRange { fields, .. } = &mut target.strategy {
            fields.email = Some(FieldRule::new("a[href^=", Pick::Mailto));
        }

        let err = target.validate().unwrap_err();
        assert!(matches!(err, TargetError::Selector { .. }));
    }

    fn assert_invalid(target: &ScrapeTarget, fragment: &str) {
        match target.validate() {
            Err(TargetError::Invalid { reason, .. }) => assert!(
                reason.contains(fragment),
                "'{}' should mention '{}'",
                reason,
                fragment
            ),
            other => panic!("expected an invalid target, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_bad_sheet_names() {
        let mut target = presets::infopark_jobs();

        target.output.sheet = "Jobs/2024: Kochi [all]".to_string();
        assert_invalid(&target, "cannot contain");

        target.output.sheet = String::new();
        assert_invalid(&target, "1 to 31");

        target.output.sheet = "x".repeat(32);
        assert_invalid(&target, "1 to 31");

        target.output.sheet = "'Jobs'".to_string();
        assert_invalid(&target, "apostrophe");

        target.output.sheet = "Kochi Jobs 2024".to_string();
        target.validate().expect("plain sheet name should pass");
    }

    #[test]
    fn test_validate_rejects_path_like_file_stems() {
        let mut target = presets::technopark_jobs();

        for stem in ["", "  ", "..", "out/jobs", "out\\jobs"] {
            target.output.file_stem = stem.to_string();
            assert_invalid(&target, "plain file name");
        }
    }

    #[test]
    fn test_validate_rejects_blank_keywords() {
        let mut target = presets::infopark_jobs();
        if let Strategy::KeywordSearch { keywords, .. } = &mut target.strategy {
            keywords.push("  ".to_string());
        }

        assert_invalid(&target, "keywords cannot be blank");
    }

    #[test]
    fn test_validate_rejects_empty_needles() {
        let mut companies = presets::infopark_companies();
        if let Strategy::IdRange { fields, .. } = &mut companies.strategy {
            fields.email = Some(FieldRule::new(
                "div.con span",
                Pick::LastContaining {
                    needle: String::new(),
                },
            ));
        }
        assert_invalid(&companies, "empty needle");

        let mut jobs = presets::infopark_jobs();
        if let Strategy::KeywordSearch { detail, .. } = &mut jobs.strategy {
            detail.email = Some(FieldRule::new(
                "span",
                Pick::FirstContaining {
                    needle: String::new(),
                },
            ));
        }
        assert_invalid(&jobs, "empty needle");
    }

    #[test]
    fn test_presets_are_valid_and_strict_by_default() {
        for target in presets::all() {
            target.validate().expect("preset should validate");
            assert!(
                !target.client.accept_invalid_certs,
                "{} should verify certificates",
                target.name
            );
        }
    }

    #[test]
    fn test_select_targets_keeps_requested_order() {
        let names = vec![
            "technopark-companies".to_string(),
            "infopark-jobs".to_string(),
        ];
        let selected = select_targets(presets::all(), &names).unwrap();
        let got: Vec<_> = selected.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(got, vec!["technopark-companies", "infopark-jobs"]);

        let err = select_targets(presets::all(), &["nope".to_string()]).unwrap_err();
        assert!(matches!(err, TargetError::UnknownTarget(name) if name == "nope"));
    }

    #[test]
    fn test_select_targets_rejects_repeated_names() {
        let names = vec!["infopark-jobs".to_string(), "infopark-jobs".to_string()];

        let err = select_targets(presets::all(), &names).unwrap_err();

        assert!(matches!(err, TargetError::DuplicateTarget(name) if name == "infopark-jobs"));
    }

    #[test]
    fn test_load_targets_from_json_file() {
        let json = serde_json::to_string_pretty(&presets::all()).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = load_targets(file.path()).expect("Failed to load targets");
        assert_eq!(loaded, presets::all());
    }
}
