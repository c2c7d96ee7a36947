use scraper::{ElementRef, Html, Selector};

use crate::target::{FieldRule, FieldRules, Pick};
use crate::types::Record;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

fn parse_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn mailto_address(href: &str) -> Option<String> {
    let address = href.strip_prefix("mailto:")?;
    let address = address.split('?').next().unwrap_or_default().trim();
    non_empty(address.to_string())
}

#[derive(Debug)]
pub(crate) struct CompiledRule {
    selector: Selector,
    pick: Pick,
}

impl CompiledRule {
    pub(crate) fn compile(rule: &FieldRule) -> Result<Self, ParseError> {
        Ok(Self {
            selector: parse_selector(&rule.selector)?,
            pick: rule.pick.clone(),
        })
    }

    /// Runs the rule against the descendants of `scope`. Blank values count as missing.
    pub(crate) fn extract(&self, scope: ElementRef) -> Option<String> {
        let mut texts = scope
            .select(&self.selector)
            .map(|e| normalize_whitespace(&elem_text(e)));

        match &self.pick {
            Pick::First => texts.next().and_then(non_empty),
            Pick::Last => texts.last().and_then(non_empty),
            Pick::FirstContaining { needle } => texts.find(|t| t.contains(needle.as_str())),
            Pick::LastContaining { needle } => {
                texts.filter(|t| t.contains(needle.as_str())).last()
            }
            Pick::Mailto => scope
                .select(&self.selector)
                .filter_map(|e| e.value().attr("href"))
                .filter_map(mailto_address)
                .last(),
            Pick::Attr { name } => scope
                .select(&self.selector)
                .find_map(|e| e.value().attr(name))
                .map(|v| v.trim().to_string())
                .and_then(non_empty),
        }
    }
}

fn compile_optional(rule: &Option<FieldRule>) -> Result<Option<CompiledRule>, ParseError> {
    rule.as_ref().map(CompiledRule::compile).transpose()
}

/// Compiled form of [`FieldRules`]; fills the text fields of a [`Record`].
#[derive(Debug)]
pub(crate) struct PageExtractor {
    title: Option<CompiledRule>,
    company: Option<CompiledRule>,
    email: Option<CompiledRule>,
}

impl PageExtractor {
    pub(crate) fn compile(rules: &FieldRules) -> Result<Self, ParseError> {
        Ok(Self {
            title: compile_optional(&rules.title)?,
            company: compile_optional(&rules.company)?,
            email: compile_optional(&rules.email)?,
        })
    }

    pub(crate) fn extract_into(&self, scope: ElementRef, record: &mut Record) {
        let slots = [
            (&self.title, &mut record.title),
            (&self.company, &mut record.company),
            (&self.email, &mut record.email),
        ];
        for (rule, slot) in slots {
            if let Some(value) = rule.as_ref().and_then(|r| r.extract(scope)) {
                *slot = value;
            }
        }
    }

    pub(crate) fn extract_page(&self, html: &str) -> Record {
        let document = Html::parse_document(html);
        let mut record = Record::default();
        self.extract_into(document.root_element(), &mut record);
        record
    }
}

/// One row of a search results table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ListingRow {
    pub title: String,
    pub company: String,
    pub link: Option<String>,
}

#[derive(Debug)]
pub(crate) struct RowExtractor {
    rows: Selector,
    link: CompiledRule,
    fields: PageExtractor,
}

impl RowExtractor {
    pub(crate) fn compile(
        row_selector: &str,
        link: &FieldRule,
        fields: &FieldRules,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            rows: parse_selector(row_selector)?,
            link: CompiledRule::compile(link)?,
            fields: PageExtractor::compile(fields)?,
        })
    }

    pub(crate) fn parse_rows(&self, html: &str) -> Vec<ListingRow> {
        let document = Html::parse_document(html);

        document
            .select(&self.rows)
            .map(|row| {
                let mut record = Record::default();
                self.fields.extract_into(row, &mut record);
                ListingRow {
                    title: record.title,
                    company: record.company,
                    link: self.link.extract(row),
                }
            })
            .collect()
    }
}
