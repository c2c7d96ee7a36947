//! The ranged-scrape loop shared by every target.
//!
//! Requests are issued one at a time. Every per-item failure becomes a
//! [`SkipReason`]; nothing here aborts a run once it has started.

use log::Level;

use crate::parser::{PageExtractor, ParseError, RowExtractor};
use crate::scraper::{Fetch, WebScraper};
use crate::target::{ScrapeTarget, Strategy, TargetError};
use crate::types::{Outcome, Record, ScrapeReport, SkipReason};

enum Plan {
    Ids(PageExtractor),
    Search {
        rows: RowExtractor,
        detail: PageExtractor,
    },
}

pub struct RangedPageScraper<F> {
    target: ScrapeTarget,
    fetcher: F,
    plan: Plan,
}

fn skip_level(reason: &SkipReason) -> Level {
    match reason {
        SkipReason::Transport(_) | SkipReason::Unparseable(_) => Level::Warn,
        SkipReason::Status(_) | SkipReason::MissingField(_) | SkipReason::NoKeywordMatch => {
            Level::Debug
        }
    }
}

impl<F: Fetch> RangedPageScraper<F> {
    pub fn new(target: ScrapeTarget, fetcher: F) -> Result<Self, ParseError> {
        let plan = match &target.strategy {
            Strategy::IdRange { fields, .. } => Plan::Ids(PageExtractor::compile(fields)?),
            Strategy::KeywordSearch {
                row_selector,
                link,
                fields,
                detail,
                ..
            } => Plan::Search {
                rows: RowExtractor::compile(row_selector, link, fields)?,
                detail: PageExtractor::compile(detail)?,
            },
        };

        Ok(Self {
            target,
            fetcher,
            plan,
        })
    }

    /// Visits every candidate URL in order and collects the outcomes.
    pub async fn run(self) -> ScrapeReport {
        let mut report = ScrapeReport::new(&self.target.name);

        match &self.target.strategy {
            Strategy::IdRange {
                url_prefix,
                start,
                end,
                ..
            } => {
                self.run_id_range(url_prefix, *start, *end, &mut report)
                    .await
            }
            Strategy::KeywordSearch {
                search_url,
                keywords,
                max_pages,
                ..
            } => {
                for keyword in keywords {
                    self.run_keyword(search_url, keyword, *max_pages, &mut report)
                        .await;
                }
            }
        }

        log::info!(
            "{}: {} record(s), {} skipped",
            report.target,
            report.records.len(),
            report.skipped.len()
        );
        report
    }

    async fn run_id_range(&self, url_prefix: &str, start: u32, end: u32, report: &mut ScrapeReport) {
        for id in start..=end {
            let url = format!("{}{}", url_prefix, id);
            log::info!("Scraping: {}", url);

            let outcome = self.scrape_id(id, &url, report).await;
            self.record(outcome, report);

            if id < end {
                tokio::time::sleep(self.target.delay()).await;
            }
        }
    }

    async fn scrape_id(&self, id: u32, url: &str, report: &mut ScrapeReport) -> Outcome {
        let Plan::Ids(extractor) = &self.plan else {
            unreachable!("ID-range targets compile to an ID plan");
        };

        let html = match self.fetcher.get_html(url).await {
            Ok(html) => html,
            Err(e) => return Outcome::skipped(url, e.into()),
        };
        report.pages_fetched += 1;

        let mut record = extractor.extract_page(&html);
        record.id = Some(id);
        record.url = url.to_string();
        self.finish(record)
    }

    async fn run_keyword(
        &self,
        search_url: &str,
        keyword: &str,
        max_pages: Option<u32>,
        report: &mut ScrapeReport,
    ) {
        log::info!("Searching jobs for keyword: {}", keyword);

        let mut page = 1;
        loop {
            let matched = self
                .scrape_search_page(search_url, keyword, page, report)
                .await;
            if matched == 0 {
                log::debug!("No matching rows on page {} for '{}'", page, keyword);
                break;
            }
            log::info!(
                "Scraped page {} for keyword '{}': {} job(s)",
                page,
                keyword,
                matched
            );

            if max_pages.is_some_and(|max| page >= max) {
                log::info!("Reached page limit {} for '{}'", page, keyword);
                break;
            }
            page += 1;
            tokio::time::sleep(self.target.delay()).await;
        }
    }

    /// Returns how many rows on the page matched the keyword.
    async fn scrape_search_page(
        &self,
        search_url: &str,
        keyword: &str,
        page: u32,
        report: &mut ScrapeReport,
    ) -> usize {
        let Plan::Search { rows, .. } = &self.plan else {
            unreachable!("keyword targets compile to a search plan");
        };

        let page_url = Strategy::search_page_url(search_url, keyword, page);
        let html = match self.fetcher.get_html(&page_url).await {
            Ok(html) => html,
            Err(e) => {
                self.record(Outcome::skipped(page_url, e.into()), report);
                return 0;
            }
        };
        report.pages_fetched += 1;

        let needle = keyword.to_lowercase();
        let mut matched = 0;
        for row in rows.parse_rows(&html) {
            let Some(link) = row.link else { continue };
            if !row.title.to_lowercase().contains(&needle) {
                log::debug!("Row '{}' does not mention '{}'", row.title, keyword);
                continue;
            }
            matched += 1;

            let url = match Strategy::detail_url(&page_url, &link) {
                Ok(url) => url,
                Err(e) => {
                    let reason = SkipReason::Unparseable(format!("invalid link '{link}': {e}"));
                    self.record(Outcome::skipped(&link, reason), report);
                    continue;
                }
            };
            let email = self.fetch_detail_email(&url, report).await;
            let record = Record {
                id: None,
                title: row.title,
                company: row.company,
                email: email.unwrap_or_default(),
                url,
            };
            let outcome = self.finish(record);
            self.record(outcome, report);
        }

        matched
    }

    async fn fetch_detail_email(&self, url: &str, report: &mut ScrapeReport) -> Option<String> {
        let Plan::Search { detail, .. } = &self.plan else {
            return None;
        };

        match self.fetcher.get_html(url).await {
            Ok(html) => {
                report.pages_fetched += 1;
                let found = detail.extract_page(&html).email;
                (!found.is_empty()).then_some(found)
            }
            Err(e) => {
                log::warn!("Failed to fetch job detail page {}: {}", url, e);
                None
            }
        }
    }

    /// Applies fallbacks, then the target's keyword and required-field checks.
    fn finish(&self, mut record: Record) -> Outcome {
        if record.company.is_empty()
            && let Some(template) = &self.target.company_fallback
        {
            let id = record.id.map(|id| id.to_string()).unwrap_or_default();
            record.company = template.replace("{id}", &id);
        }
        if record.email.is_empty()
            && let Some(fallback) = &self.target.email_fallback
        {
            record.email = fallback.clone();
        }

        if !self.target.title_keywords.is_empty() {
            let title = record.title.to_lowercase();
            let matches = self
                .target
                .title_keywords
                .iter()
                .any(|k| title.contains(&k.to_lowercase()));
            if !matches {
                return Outcome::skipped(record.url, SkipReason::NoKeywordMatch);
            }
        }

        match self.target.required.iter().find(|f| !record.has(**f)) {
            Some(missing) => Outcome::skipped(record.url, SkipReason::MissingField(*missing)),
            None => Outcome::Success(record),
        }
    }

    fn record(&self, outcome: Outcome, report: &mut ScrapeReport) {
        match &outcome {
            Outcome::Success(record) => log::info!("Found: {}", record),
            Outcome::Skipped(skipped) => log::log!(
                skip_level(&skipped.reason),
                "Skipping {}: {}",
                skipped.url,
                skipped.reason
            ),
        }
        report.push(outcome);
    }
}

/// Runs one target over the network.
pub async fn run_target(target: ScrapeTarget) -> Result<ScrapeReport, TargetError> {
    let name = target.name.clone();
    let fetcher = WebScraper::new(&target.client).map_err(|e| TargetError::Invalid {
        name: name.clone(),
        reason: format!("failed to build HTTP client: {e}"),
    })?;
    let scraper = RangedPageScraper::new(target, fetcher)
        .map_err(|source| TargetError::Selector { name, source })?;

    Ok(scraper.run().await)
}
