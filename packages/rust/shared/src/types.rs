//! Core domain types shared by the crawler, ranking, and pipeline crates.

use serde::{Deserialize, Serialize};

/// Sentinel URL for crawl pages that carry no usable address.
pub const UNKNOWN_URL: &str = "Unknown URL";

/// Value the model is told to write for unsupported fields.
pub const NOT_FOUND: &str = "Not found";

// ---------------------------------------------------------------------------
// CrawlPage
// ---------------------------------------------------------------------------

/// One crawled document as returned by the crawl service.
///
/// Every field is optional upstream; accessors apply the fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlPage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The `metadata` object attached to a crawl page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "sourceURL", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CrawlPage {
    /// Build a page from a URL and markdown body (handy for tests and fakes).
    pub fn new(url: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            markdown: Some(markdown.into()),
            metadata: None,
            url: Some(url.into()),
        }
    }

    /// Attach a title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.get_or_insert_with(PageMetadata::default).title = Some(title.into());
        self
    }

    /// Best available URL: `metadata.sourceURL`, then `metadata.url`, then
    /// `url`, else [`UNKNOWN_URL`].
    pub fn url(&self) -> &str {
        let meta = self.metadata.as_ref();
        [
            meta.and_then(|m| m.source_url.as_deref()),
            meta.and_then(|m| m.url.as_deref()),
            self.url.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|u| !u.is_empty())
        .unwrap_or(UNKNOWN_URL)
    }

    /// Page title, empty when absent.
    pub fn title(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.title.as_deref())
            .unwrap_or("")
    }

    /// Markdown body, empty when absent.
    pub fn markdown(&self) -> &str {
        self.markdown.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// Coarse purpose of a page, inferred from its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Homepage,
    Pricing,
    Faq,
    Trust,
    About,
    Legal,
    Product,
    Contact,
    Blog,
    General,
}

impl Intent {
    /// Tag written into prompts and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::Pricing => "pricing",
            Self::Faq => "faq",
            Self::Trust => "trust",
            Self::About => "about",
            Self::Legal => "legal",
            Self::Product => "product",
            Self::Contact => "contact",
            Self::Blog => "blog",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SourceChunk
// ---------------------------------------------------------------------------

/// A trimmed, attributed piece of page content fed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceChunk {
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

// ---------------------------------------------------------------------------
// Brief
// ---------------------------------------------------------------------------

/// The structured brief the model is asked to produce.
///
/// Deserialization is lenient: missing fields take their defaults, so any
/// model output with the right shape converts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Brief {
    pub title: String,
    pub one_liner: String,
    pub executive_summary: String,
    pub key_facts: Vec<KeyFact>,
    pub pricing_offers: Vec<PricingOffer>,
    pub claims_proof: Vec<ClaimProof>,
    pub faqs_policies: Vec<FaqPolicy>,
    pub trust_signals: Vec<TrustSignal>,
    pub entities: Vec<Entity>,
    pub risks_gaps: Vec<String>,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyFact {
    pub label: String,
    pub value: String,
    pub source_url: String,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingOffer {
    pub plan: String,
    pub price: String,
    pub notes: String,
    pub source_url: String,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimProof {
    pub claim: String,
    pub proof: String,
    pub source_url: String,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqPolicy {
    pub question: String,
    pub answer: String,
    pub source_url: String,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustSignal {
    pub signal: String,
    pub source_url: String,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub relevance: String,
    pub source_url: String,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceRef {
    pub url: String,
    pub title: String,
}

impl Brief {
    /// The canonical brief returned when no source survives selection.
    pub fn not_found() -> Self {
        Self {
            title: NOT_FOUND.into(),
            one_liner: NOT_FOUND.into(),
            executive_summary: NOT_FOUND.into(),
            risks_gaps: vec![NOT_FOUND.into()],
            ..Self::default()
        }
    }
}
