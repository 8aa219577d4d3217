//! Prompt assembly for brief extraction.
//!
//! The builder is a pure function of goal, sources, and limits. Character
//! budgets are applied before this point, when sources are built.

use std::fmt::Write as _;

use serde_json::{Value, json};

use sitebrief_shared::{BriefLimits, NOT_FOUND, SourceChunk};

/// Shape of the expected output, with type names in place of values.
pub fn brief_schema() -> Value {
    json!({
        "title": "string",
        "one_liner": "string",
        "executive_summary": "string",
        "key_facts": [
            {"label": "string", "value": "string", "source_url": "string", "evidence": "string"}
        ],
        "pricing_offers": [
            {"plan": "string", "price": "string", "notes": "string", "source_url": "string", "evidence": "string"}
        ],
        "claims_proof": [
            {"claim": "string", "proof": "string", "source_url": "string", "evidence": "string"}
        ],
        "faqs_policies": [
            {"question": "string", "answer": "string", "source_url": "string", "evidence": "string"}
        ],
        "trust_signals": [
            {"signal": "string", "source_url": "string", "evidence": "string"}
        ],
        "entities": [
            {"name": "string", "type": "string", "relevance": "string", "source_url": "string", "evidence": "string"}
        ],
        "risks_gaps": ["string"],
        "sources": [
            {"url": "string", "title": "string"}
        ],
    })
}

/// Pretty-printed [`brief_schema`].
pub fn schema_text() -> String {
    serde_json::to_string_pretty(&brief_schema()).unwrap_or_default()
}

const QUALITY_BAR: &str = "\
Brief quality bar:
- prioritize decision-critical facts over general marketing copy.
- include concrete numbers, timelines, constraints, and qualifiers when present.
- keep executive_summary concise and specific.
- avoid duplicates across sections.
- prefer the strongest available evidence and say so when something is uncertain.";

const DEPTH_REQUIREMENTS: &str = "\
Depth requirements by field:
- one_liner: one sentence covering core positioning and audience.
- executive_summary: 120-180 words covering the offer, the buyer, pricing posture, trust posture, and the main risk.
- key_facts.value: a concrete 1-2 sentence insight, not a fragment.
- pricing_offers.notes: billing cadence, trials or guarantees, commitments, or hidden constraints when available.
- claims_proof.proof: whether the proof is strong, weak, or conditional, and why.
- faqs_policies.answer: the practical implication for a buyer.
- trust_signals.signal: why it increases confidence.
- entities.relevance: why the entity matters to strategy or buying decisions.
- risks_gaps: each item states the consequence if ignored.";

const COVERAGE: &str = "\
Coverage guidance:
- draw on diverse sources across intents when available (pricing, faq/support, product, trust, legal, about, contact).";

const EVIDENCE_RULES: &str = "\
Evidence rules:
- evidence must be a short snippet (max 25 words) taken from the source.
- every fact or claim must include a source_url and evidence.";

/// Build the extraction prompt.
///
/// Sources are numbered from 1. The per-field limits are instructions to
/// the model; nothing here truncates output.
pub fn build_prompt(goal: &str, sources: &[SourceChunk], limits: &BriefLimits) -> String {
    let mut prompt = String::with_capacity(
        4_096 + sources.iter().map(|s| s.content.len() + s.url.len() + 64).sum::<usize>(),
    );

    let _ = writeln!(
        prompt,
        "You are SiteBrief, an analyst who produces high-signal executive briefs about websites."
    );
    let _ = writeln!(
        prompt,
        "Use only the provided sources. If a field is missing, write \"{NOT_FOUND}\"."
    );
    let _ = writeln!(prompt, "Return ONLY valid JSON. No markdown, no commentary.");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Goal focus: {goal}");
    let _ = writeln!(prompt);

    for section in [QUALITY_BAR, DEPTH_REQUIREMENTS, COVERAGE] {
        let _ = writeln!(prompt, "{section}");
        let _ = writeln!(prompt);
    }

    let _ = writeln!(prompt, "Hard limits:");
    for (field, max) in limits.fields() {
        let _ = writeln!(prompt, "- {field}: max {max}");
    }
    let _ = writeln!(prompt);

    let _ = writeln!(prompt, "{EVIDENCE_RULES}");
    let _ = writeln!(prompt);

    let _ = writeln!(prompt, "JSON schema (types only):");
    let _ = writeln!(prompt, "{}", schema_text());
    let _ = writeln!(prompt);

    let _ = write!(prompt, "Sources:");
    for (index, source) in sources.iter().enumerate() {
        let _ = write!(prompt, "\n\n{}", source_block(index + 1, source));
    }

    prompt
}

/// One `[Source N]` block.
fn source_block(number: usize, source: &SourceChunk) -> String {
    let title = if source.title.trim().is_empty() {
        "Untitled"
    } else {
        source.title.as_str()
    };
    let mut block = format!("[Source {number}] URL: {}\nTitle: {title}", source.url);
    if let Some(intent) = source.intent {
        let _ = write!(block, "\nIntent: {intent}");
    }
    let _ = write!(block, "\nContent: {}", source.content);
    block
}
