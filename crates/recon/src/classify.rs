use std::collections::HashSet;

use crate::config::SearchConfig;
use crate::model::{ConfidenceDetail, MatchBasis, MatchResult, MatchStatus, NameParts, VariantSource};

/// Classifies search candidates against a normalized name.
///
/// Holds only the search context (view label and the collaborator's row
/// limit); classification itself is a pure function of its arguments.
#[derive(Debug, Clone)]
pub struct Classifier {
    view: String,
    result_limit: Option<usize>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl Classifier {
    pub fn new(search: &SearchConfig) -> Self {
        Self {
            view: search.view.clone(),
            result_limit: search.result_limit,
        }
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    /// Decide how `candidates` relate to `name_parts`.
    ///
    /// Matched keeps every exact match (first occurrence, input order).
    /// PartialMatch keeps the whole candidate list so a human picks.
    pub fn classify(&self, name_parts: &NameParts, candidates: &[String], entity_key: &str) -> MatchResult {
        let possibly_truncated = self.result_limit.is_some_and(|limit| candidates.len() >= limit);
        let detail = |basis: Vec<MatchBasis>, multiple_matches: bool| ConfidenceDetail {
            candidate_count: candidates.len(),
            basis,
            multiple_matches,
            possibly_truncated,
            result_limit: self.result_limit,
        };

        if possibly_truncated {
            tracing::debug!(
                entity = entity_key,
                candidates = candidates.len(),
                "candidate list reached the search result limit"
            );
        }

        // Exact predicate, deduplicated by first occurrence.
        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        let mut basis = Vec::new();
        for candidate in candidates {
            if let Some((source, variant)) = exact_basis(name_parts, candidate) {
                if seen.insert(candidate.as_str()) {
                    matches.push(candidate.clone());
                    basis.push(MatchBasis {
                        candidate: candidate.clone(),
                        source,
                        variant: variant.to_string(),
                    });
                }
            }
        }

        if !matches.is_empty() {
            let multiple = matches.len() > 1;
            tracing::debug!(entity = entity_key, matches = matches.len(), "matched");
            return MatchResult {
                entity_key: entity_key.to_string(),
                view: self.view.clone(),
                status: MatchStatus::Matched,
                matches,
                confidence_detail: detail(basis, multiple),
            };
        }

        if !name_parts.expected_matches_target.is_empty() {
            let partial: Vec<MatchBasis> = candidates
                .iter()
                .filter_map(|candidate| {
                    expected_token_basis(name_parts, candidate).map(|variant| MatchBasis {
                        candidate: candidate.clone(),
                        source: VariantSource::ExpectedToken,
                        variant: variant.to_string(),
                    })
                })
                .collect();
            if !partial.is_empty() {
                tracing::debug!(entity = entity_key, candidates = candidates.len(), "partial match");
                return MatchResult {
                    entity_key: entity_key.to_string(),
                    view: self.view.clone(),
                    status: MatchStatus::PartialMatch,
                    matches: candidates.to_vec(),
                    confidence_detail: detail(partial, false),
                };
            }
        }

        tracing::debug!(entity = entity_key, candidates = candidates.len(), "no match");
        MatchResult {
            entity_key: entity_key.to_string(),
            view: self.view.clone(),
            status: MatchStatus::NoMatch,
            matches: Vec::new(),
            confidence_detail: detail(Vec::new(), false),
        }
    }
}

/// Case-insensitive containment in either direction. Blank strings never
/// match anything.
fn contains_either_way(candidate: &str, variant: &str) -> bool {
    let c = candidate.trim().to_lowercase();
    let v = variant.trim().to_lowercase();
    if c.is_empty() || v.is_empty() {
        return false;
    }
    c.contains(&v) || v.contains(&c)
}

/// First known rendering the candidate matches, in priority order:
/// normalized, swapped, then curated expected matches.
fn exact_basis<'a>(name_parts: &'a NameParts, candidate: &str) -> Option<(VariantSource, &'a str)> {
    let normalized = name_parts
        .normalized_names
        .iter()
        .map(|v| (VariantSource::Normalized, v));
    let swapped = name_parts.swapped_names.iter().map(|v| (VariantSource::Swapped, v));
    let expected = name_parts
        .expected_matches_target
        .iter()
        .map(|v| (VariantSource::Expected, v));

    normalized
        .chain(swapped)
        .chain(expected)
        .find(|(_, variant)| contains_either_way(candidate, variant))
        .map(|(source, variant)| (source, variant.as_str()))
}

/// Curated expected match sharing a whole word (two characters or more)
/// with the candidate.
fn expected_token_basis<'a>(name_parts: &'a NameParts, candidate: &str) -> Option<&'a str> {
    let candidate_words = words(candidate);
    if candidate_words.is_empty() {
        return None;
    }
    name_parts
        .expected_matches_target
        .iter()
        .find(|expected| words(expected).iter().any(|w| candidate_words.contains(w)))
        .map(String::as_str)
}

fn words(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Classify with the default search context.
pub fn classify(name_parts: &NameParts, candidates: &[String], entity_key: &str) -> MatchResult {
    Classifier::default().classify(name_parts, candidates, entity_key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
