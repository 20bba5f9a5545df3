//! Result Ranker: per-variant normalization, cross-variant score fusion,
//! and final ordering (spec §3, §4.7).

use std::collections::HashMap;

use thaisearch_core::config::BoostConfig;
use thaisearch_core::query::VariantType;
use thaisearch_core::ranking::{Pagination, RankedHit};
use thaisearch_core::search::EngineSearchResult;

/// Fuses the per-variant search results of one request into a single
/// ranked, deduplicated hit list.
///
/// Pipeline (spec §4.7):
/// 1. Min-max normalize each variant's hit scores into `[0.0, 1.0]`
///    independently — engine scores aren't comparable across variants.
/// 2. Accumulate by `document_id`, summing each variant's
///    `normalized_score * boost` into that document's contributions.
/// 3. Clamp: divide every document's total by the top document's total so
///    the best hit always scores exactly `1.0`.
/// 4. Sort by score descending, tie-broken by contributing-variant-count
///    descending, then best-variant weight descending, then document id
///    ascending (a fully deterministic order).
/// 5. Drop hits below `min_score_threshold`, then apply offset/limit.
///
/// `thai_detected` comes from the `ProcessedQuery` that produced these
/// variants: when true, every Thai-bearing variant's contribution (i.e.
/// every variant type except `ENGLISH_ONLY`) gets the additional
/// `thai_match` multiplier (spec §4.7 step 3); `ENGLISH_ONLY` never does,
/// since by construction its text has had Thai codepoints stripped out.
pub fn rank(
    variant_results: &[EngineSearchResult],
    boosts: &BoostConfig,
    thai_detected: bool,
    min_score_threshold: f32,
    offset: u32,
    limit: u32,
) -> (Vec<RankedHit>, Pagination) {
    let mut accumulated: HashMap<String, Accumulator> = HashMap::new();

    for result in variant_results.iter().filter(|r| r.is_usable()) {
        let normalized = normalize(&result.hits);
        let boost = variant_boost(result.variant.variant_type, boosts, thai_detected);

        for (hit, score) in result.hits.iter().zip(normalized) {
            let entry = accumulated
                .entry(hit.document_id.clone())
                .or_insert_with(|| Accumulator::new(hit.payload.clone(), hit.highlight.clone()));

            let contribution = score * boost * result.variant.weight;
            entry.add(result.variant.variant_type, result.variant.weight, contribution);
        }
    }

    let total_hits = accumulated.len() as u64;
    let max_total = accumulated
        .values()
        .map(|a| a.total())
        .fold(0.0_f32, f32::max);

    let mut hits: Vec<(RankedHit, f32)> = accumulated
        .into_iter()
        .map(|(document_id, acc)| acc.into_ranked_hit(document_id, max_total))
        .filter(|(hit, _)| hit.score >= min_score_threshold)
        .collect();

    hits.sort_by(|(a, a_weight), (b, b_weight)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.contributions.len().cmp(&a.contributions.len()))
            .then_with(|| b_weight.partial_cmp(a_weight).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.document_id.cmp(&b.document_id))
    });

    let offset_usize = offset as usize;
    let limit_usize = limit.max(1) as usize;
    let page: Vec<RankedHit> = hits
        .into_iter()
        .skip(offset_usize)
        .take(limit_usize)
        .map(|(hit, _)| hit)
        .collect();

    let pagination = Pagination {
        offset,
        limit,
        total_hits,
        has_next_page: (offset_usize + page.len()) < total_hits as usize,
        has_previous_page: offset > 0,
    };

    (page, pagination)
}

/// Type boost from the config table, with the two multiplicative boosts
/// spec §4.7 step 3 layers on top of it: `thai_match` whenever the query
/// detected Thai and this variant is Thai-bearing, and `compound_match`
/// for the variant that carries a dictionary-compound match. Boosts
/// compose multiplicatively, as the spec requires.
fn variant_boost(variant_type: VariantType, boosts: &BoostConfig, thai_detected: bool) -> f32 {
    let mut boost = boosts.for_variant(variant_type);
    if thai_detected && variant_type != VariantType::EnglishOnly {
        boost *= boosts.thai_match;
    }
    if variant_type == VariantType::CompoundSplit {
        boost *= boosts.compound_match;
    }
    boost
}

/// Min-max normalizes engine scores within one variant's hit list. A
/// single hit, or a list where every score is equal, normalizes to `1.0`
/// for all hits — there's no ordering information to lose.
fn normalize(hits: &[thaisearch_core::search::RawHit]) -> Vec<f32> {
    if hits.is_empty() {
        return Vec::new();
    }
    let min = hits.iter().map(|h| h.engine_score).fold(f32::MAX, f32::min);
    let max = hits.iter().map(|h| h.engine_score).fold(f32::MIN, f32::max);

    if (max - min).abs() < f32::EPSILON {
        return vec![1.0; hits.len()];
    }

    hits.iter()
        .map(|h| (h.engine_score - min) / (max - min))
        .collect()
}

struct Accumulator {
    payload: serde_json::Value,
    highlight: Option<String>,
    /// Per-variant summed contribution and the generating variant's weight
    /// (spec §4.7 step 5(b) tie-breaks on the latter, not the type's static
    /// boost table).
    contributions: HashMap<VariantType, (f32, f32)>,
}

impl Accumulator {
    fn new(payload: serde_json::Value, highlight: Option<String>) -> Self {
        Self {
            payload,
            highlight,
            contributions: HashMap::new(),
        }
    }

    fn add(&mut self, variant_type: VariantType, weight: f32, contribution: f32) {
        let entry = self.contributions.entry(variant_type).or_insert((0.0, weight));
        entry.0 += contribution;
        entry.1 = weight;
    }

    fn total(&self) -> f32 {
        self.contributions.values().map(|(score, _)| score).sum()
    }

    fn best_variant(&self) -> (VariantType, f32) {
        self.contributions
            .iter()
            .max_by(|a, b| a.1 .0.partial_cmp(&b.1 .0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(v, (_, weight))| (*v, *weight))
            .unwrap_or((VariantType::Fallback, 0.0))
    }

    fn into_ranked_hit(self, document_id: String, max_total: f32) -> (RankedHit, f32) {
        let total = self.total();
        let score = if max_total > 0.0 { total / max_total } else { 0.0 };
        let (best_variant, best_variant_weight) = self.best_variant();
        let contributions = self
            .contributions
            .into_iter()
            .map(|(v, (score, _))| (variant_tag(v), score))
            .collect();

        (
            RankedHit {
                document_id,
                score,
                best_variant,
                contributions,
                payload: self.payload,
                highlight: self.highlight,
            },
            best_variant_weight,
        )
    }
}

fn variant_tag(variant_type: VariantType) -> String {
    serde_json::to_value(variant_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaisearch_core::query::QueryVariant;
    use thaisearch_core::search::RawHit;

    fn hit(id: &str, score: f32) -> RawHit {
        RawHit {
            document_id: id.to_string(),
            engine_score: score,
            payload: serde_json::json!({"id": id}),
            highlight: None,
        }
    }

    #[test]
    fn top_hit_always_scores_one() {
        let result = EngineSearchResult {
            variant: QueryVariant::original("x"),
            hits: vec![hit("a", 10.0), hit("b", 5.0)],
            total_hits: 2,
            latency: std::time::Duration::ZERO,
            error: false,
            error_reason: None,
        };
        let (hits, _) = rank(&[result], &BoostConfig::default(), false, 0.0, 0, 20);
        assert_eq!(hits[0].document_id, "a");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn documents_in_multiple_variants_accumulate_contributions() {
        let r1 = EngineSearchResult {
            variant: QueryVariant::original("x"),
            hits: vec![hit("a", 1.0)],
            total_hits: 1,
            latency: std::time::Duration::ZERO,
            error: false,
            error_reason: None,
        };
        let mut tokenized = QueryVariant::original("y");
        tokenized.variant_type = VariantType::Tokenized;
        let r2 = EngineSearchResult {
            variant: tokenized,
            hits: vec![hit("a", 1.0)],
            total_hits: 1,
            latency: std::time::Duration::ZERO,
            error: false,
            error_reason: None,
        };
        let (hits, _) = rank(&[r1, r2], &BoostConfig::default(), false, 0.0, 0, 20);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].contributions.len(), 2);
    }

    #[test]
    fn min_score_threshold_drops_low_scoring_hits() {
        let result = EngineSearchResult {
            variant: QueryVariant::original("x"),
            hits: vec![hit("a", 10.0), hit("b", 0.0)],
            total_hits: 2,
            latency: std::time::Duration::ZERO,
            error: false,
            error_reason: None,
        };
        let (hits, _) = rank(&[result], &BoostConfig::default(), false, 0.5, 0, 20);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "a");
    }

    #[test]
    fn pagination_reports_next_page_correctly() {
        let result = EngineSearchResult {
            variant: QueryVariant::original("x"),
            hits: vec![hit("a", 3.0), hit("b", 2.0), hit("c", 1.0)],
            total_hits: 3,
            latency: std::time::Duration::ZERO,
            error: false,
            error_reason: None,
        };
        let (hits, pagination) = rank(&[result], &BoostConfig::default(), false, 0.0, 0, 2);
        assert_eq!(hits.len(), 2);
        assert!(pagination.has_next_page);
        assert!(!pagination.has_previous_page);
    }

    #[test]
    fn failed_variants_contribute_nothing() {
        let failed = EngineSearchResult::failed(QueryVariant::original("x"), "boom");
        let (hits, pagination) = rank(&[failed], &BoostConfig::default(), false, 0.0, 0, 20);
        assert!(hits.is_empty());
        assert_eq!(pagination.total_hits, 0);
    }

    #[test]
    fn contribution_scales_by_variant_weight() {
        // Two distinct documents, each the sole hit of its own variant, so
        // each normalizes to 1.0 independently and the only thing left to
        // separate their final scores is `variant.weight`.
        let full_weight = QueryVariant::original("x");
        let r1 = EngineSearchResult {
            variant: full_weight,
            hits: vec![hit("a", 1.0)],
            total_hits: 1,
            latency: std::time::Duration::ZERO,
            error: false,
            error_reason: None,
        };
        let mut half_weight = QueryVariant::original("y");
        half_weight.weight = 0.5;
        let r2 = EngineSearchResult {
            variant: half_weight,
            hits: vec![hit("b", 1.0)],
            total_hits: 1,
            latency: std::time::Duration::ZERO,
            error: false,
            error_reason: None,
        };
        let (hits, _) = rank(&[r1, r2], &BoostConfig::default(), false, 0.0, 0, 20);
        let a = hits.iter().find(|h| h.document_id == "a").unwrap();
        let b = hits.iter().find(|h| h.document_id == "b").unwrap();
        assert!((a.score - 1.0).abs() < 1e-6);
        assert!((b.score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn tie_break_prefers_heavier_variant_weight_not_static_type_boost() {
        let boosts = BoostConfig::default();
        // Engineered so both documents land on the exact same total
        // (boost * weight = 2.0 for each), tying on score and on
        // contributing-variant count. If the tie-break still compared
        // `VariantType::default_boost()` (ORIGINAL=2.0 > FALLBACK=0.6) it
        // would put "a" first; comparing actual variant weight instead
        // must put "b" first, since its weight of ~3.33 beats "a"'s 1.0.
        let light_original = QueryVariant::original("x");
        let r1 = EngineSearchResult {
            variant: light_original,
            hits: vec![hit("a", 1.0)],
            total_hits: 1,
            latency: std::time::Duration::ZERO,
            error: false,
            error_reason: None,
        };
        let mut heavy_fallback = QueryVariant::original("y");
        heavy_fallback.variant_type = VariantType::Fallback;
        heavy_fallback.weight = boosts.exact / boosts.fallback;
        let r2 = EngineSearchResult {
            variant: heavy_fallback,
            hits: vec![hit("b", 1.0)],
            total_hits: 1,
            latency: std::time::Duration::ZERO,
            error: false,
            error_reason: None,
        };
        let (hits, _) = rank(&[r1, r2], &boosts, false, 0.0, 0, 20);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].score - hits[1].score).abs() < 1e-6);
        assert_eq!(hits[0].document_id, "b");
        assert_eq!(hits[1].document_id, "a");
    }

    #[test]
    fn thai_detected_boosts_every_variant_but_english_only() {
        let boosts = BoostConfig::default();
        let base = boosts.for_variant(VariantType::Original);
        assert_eq!(variant_boost(VariantType::Original, &boosts, false), base);
        assert_eq!(
            variant_boost(VariantType::Original, &boosts, true),
            base * boosts.thai_match
        );
        assert_eq!(
            variant_boost(VariantType::Tokenized, &boosts, true),
            boosts.for_variant(VariantType::Tokenized) * boosts.thai_match
        );
        // ENGLISH_ONLY's text has had Thai stripped out; thai_detected
        // never applies the thai_match multiplier to it.
        assert_eq!(
            variant_boost(VariantType::EnglishOnly, &boosts, true),
            boosts.for_variant(VariantType::EnglishOnly)
        );
    }
}
