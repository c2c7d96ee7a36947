//! Built-in targets for the Technopark (Trivandrum) and Infopark (Kochi) sites.

use crate::target::{
    ClientConfig, FieldRule, FieldRules, OutputSpec, Pick, ScrapeTarget, Strategy,
};
use crate::types::{Column, Field};

pub const TECHNOPARK_URL: &str = "https://technopark.in";
pub const INFOPARK_URL: &str = "https://infopark.in";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// All built-in targets in their default run order.
pub fn all() -> Vec<ScrapeTarget> {
    vec![
        technopark_jobs(),
        infopark_jobs(),
        infopark_companies(),
        technopark_companies(),
    ]
}

fn mailto_rule() -> FieldRule {
    FieldRule::new("a[href^='mailto:']", Pick::Mailto)
}

fn con_span_email_rule() -> FieldRule {
    FieldRule::new(
        "div.con span",
        Pick::LastContaining {
            needle: "@".to_string(),
        },
    )
}

pub fn technopark_jobs() -> ScrapeTarget {
    ScrapeTarget {
        name: "technopark-jobs".to_string(),
        strategy: Strategy::IdRange {
            url_prefix: format!("{}/job-details/", TECHNOPARK_URL),
            start: 20716,
            end: 21599,
            fields: FieldRules {
                title: Some(FieldRule::new("div.mx-4.mt-5 h1", Pick::First)),
                company: Some(FieldRule::new(
                    "a[href^='/company-details/']",
                    Pick::First,
                )),
                email: Some(mailto_rule()),
            },
        },
        client: ClientConfig {
            timeout_secs: None,
            user_agent: Some(BROWSER_USER_AGENT.to_string()),
            accept_invalid_certs: false,
        },
        delay_ms: 300,
        required: Vec::new(),
        title_keywords: ["python", "golang", "mern", "devops", "full stack"]
            .map(String::from)
            .to_vec(),
        email_fallback: None,
        company_fallback: None,
        output: OutputSpec {
            file_stem: "techno_park_jobs".to_string(),
            sheet: "Jobs".to_string(),
            columns: vec![
                Column::new(Field::Id, "ID"),
                Column::new(Field::Title, "Title"),
                Column::new(Field::Company, "Company"),
                Column::new(Field::Email, "Email"),
                Column::new(Field::Url, "URL"),
            ],
        },
    }
}

pub fn infopark_jobs() -> ScrapeTarget {
    ScrapeTarget {
        name: "infopark-jobs".to_string(),
        strategy: Strategy::KeywordSearch {
            search_url: format!(
                "{}/companies/job-search?search={{keyword}}&page={{page}}",
                INFOPARK_URL
            ),
            keywords: ["devops", "python", "go", "full stack"]
                .map(String::from)
                .to_vec(),
            row_selector: "tr".to_string(),
            link: FieldRule::new(
                "a",
                Pick::Attr {
                    name: "href".to_string(),
                },
            ),
            fields: FieldRules {
                title: Some(FieldRule::new("td.head", Pick::First)),
                company: Some(FieldRule::new("td.date", Pick::First)),
                email: None,
            },
            detail: FieldRules {
                email: Some(con_span_email_rule()),
                ..Default::default()
            },
            max_pages: None,
        },
        client: ClientConfig {
            timeout_secs: Some(15),
            user_agent: None,
            accept_invalid_certs: false,
        },
        delay_ms: 500,
        required: Vec::new(),
        title_keywords: Vec::new(),
        email_fallback: Some("Not found".to_string()),
        company_fallback: None,
        output: OutputSpec {
            file_stem: "info_park_jobs".to_string(),
            sheet: "Jobs".to_string(),
            columns: vec![
                Column::new(Field::Title, "Title"),
                Column::new(Field::Company, "Company"),
                Column::new(Field::Email, "Email"),
                Column::new(Field::Url, "Link"),
            ],
        },
    }
}

pub fn infopark_companies() -> ScrapeTarget {
    ScrapeTarget {
        name: "infopark-companies".to_string(),
        strategy: Strategy::IdRange {
            url_prefix: format!("{}/company-jobs/", INFOPARK_URL),
            start: 1,
            end: 500,
            fields: FieldRules {
                title: None,
                company: Some(FieldRule::new("div.con h4", Pick::First)),
                email: Some(con_span_email_rule()),
            },
        },
        client: ClientConfig {
            timeout_secs: Some(15),
            user_agent: None,
            accept_invalid_certs: false,
        },
        delay_ms: 300,
        required: vec![Field::Company, Field::Email],
        title_keywords: Vec::new(),
        email_fallback: None,
        company_fallback: None,
        output: OutputSpec {
            file_stem: "infopark_company_emails".to_string(),
            sheet: "Companies".to_string(),
            columns: vec![
                Column::new(Field::Company, "Company Name"),
                Column::new(Field::Email, "Email"),
                Column::new(Field::Url, "URL"),
            ],
        },
    }
}

pub fn technopark_companies() -> ScrapeTarget {
    ScrapeTarget {
        name: "technopark-companies".to_string(),
        strategy: Strategy::IdRange {
            url_prefix: format!("{}/company-details/", TECHNOPARK_URL),
            start: 5610,
            end: 6076,
            fields: FieldRules {
                title: None,
                company: Some(FieldRule::new("title", Pick::First)),
                email: Some(mailto_rule()),
            },
        },
        client: ClientConfig {
            timeout_secs: Some(15),
            user_agent: Some(BROWSER_USER_AGENT.to_string()),
            accept_invalid_certs: false,
        },
        delay_ms: 300,
        required: vec![Field::Email],
        title_keywords: Vec::new(),
        email_fallback: None,
        company_fallback: Some("Company {id}".to_string()),
        output: OutputSpec {
            file_stem: "technopark_company_emails".to_string(),
            sheet: "Companies".to_string(),
            columns: vec![
                Column::new(Field::Id, "ID"),
                Column::new(Field::Company, "Company Name"),
                Column::new(Field::Email, "Email"),
                Column::new(Field::Url, "URL"),
            ],
        },
    }
}
