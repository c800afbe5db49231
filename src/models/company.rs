use serde::{Deserialize, Serialize};

/// Canonical company reference record.
///
/// Historical exports of the reference table disagreed on header names
/// (`symbol` vs `ticker`, `Organization Founded Year` vs `founding`).
/// This struct is the single authoritative schema; the loader maps the
/// known aliases onto it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub founded_year: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}

impl CompanyProfile {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: None,
            industry: None,
            founded_year: None,
            exchange: None,
        }
    }
}

/// A news snippet attached to a ticker, as returned by the VCI GraphQL
/// news block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_content: Option<String>,
}
