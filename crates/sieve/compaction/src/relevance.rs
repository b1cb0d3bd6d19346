//! Phishing-relevance scoring of chunks.

use sieve_policy::RelevanceTable;

fn has_url(lowered: &str) -> bool {
    lowered.contains("http://") || lowered.contains("https://") || lowered.contains("www.")
}

/// Relevance points for one chunk.
///
/// Each keyword rule adds its points at most once. Brand keywords add
/// `brand_points` for every distinct keyword present.
pub fn score_chunk(text: &str, table: &RelevanceTable) -> u32 {
    let lowered = text.to_lowercase();
    let mut score: u32 = 0;

    for rule in &table.keywords {
        if rule
            .terms
            .iter()
            .any(|term| lowered.contains(&term.to_lowercase()))
        {
            score = score.saturating_add(rule.points);
        }
    }

    if has_url(&lowered) {
        score = score.saturating_add(table.url_points);
    }

    let brands = table
        .brand_keywords
        .iter()
        .filter(|brand| !brand.is_empty() && lowered.contains(&brand.to_lowercase()))
        .count() as u32;
    score.saturating_add(table.brand_points.saturating_mul(brands))
}
