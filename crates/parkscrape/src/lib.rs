//! Sequential scrapers for the Technopark and Infopark job sites.
//!
//! A [`ScrapeTarget`] describes which URLs to visit and which elements hold
//! each field; [`RangedPageScraper`] walks them one request at a time and
//! [`TabularExporter`] writes the collected records once at the end.

pub mod export;
mod parser;
pub mod presets;
pub mod runner;
pub mod scraper;
pub mod target;
pub mod types;
pub mod utils;

pub use export::{ExportError, OutputFormat, TabularExporter};
pub use parser::ParseError;
pub use runner::{RangedPageScraper, run_target};
pub use scraper::{Fetch, ScraperError, WebScraper};
pub use target::{ScrapeTarget, TargetError};
