/// Reciprocal Rank Fusion over the vector and lexical candidate lists
///
/// RRF score for each document = sum of 1/(k + rank_i) over each list i it
/// appears in. Ranks are the 1-based positions as received; raw provider
/// scores are never compared across lists.
///
/// Ordering: fused score descending, then presence in both lists, then order
/// of first appearance scanning the vector list and then the lexical list.
/// When an id is in both lists its attributes come from the vector list.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::{CandidateResult, FusedResult};

/// Conventional RRF smoothing constant.
pub const DEFAULT_RRF_K: f64 = 60.0;

#[derive(Debug, Clone, Copy)]
pub struct RankFusion {
    k: f64,
}

impl Default for RankFusion {
    fn default() -> Self {
        Self { k: DEFAULT_RRF_K }
    }
}

impl RankFusion {
    /// Create a fusion engine with smoothing constant `k`.
    ///
    /// A non-positive or non-finite `k` falls back to [`DEFAULT_RRF_K`].
    pub fn new(k: f64) -> Self {
        if k.is_finite() && k > 0.0 {
            Self { k }
        } else {
            tracing::warn!(k, fallback = DEFAULT_RRF_K, "Invalid RRF k, using default");
            Self::default()
        }
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Contribution of a single 1-based rank.
    pub fn contribution(&self, rank: usize) -> f64 {
        1.0 / (self.k + rank as f64)
    }

    /// Fuse two ranked lists over their full union.
    pub fn fuse(&self, vector: &[CandidateResult], lexical: &[CandidateResult]) -> Vec<FusedResult> {
        // Insertion order of `fused` is first-appearance order (vector, then lexical)
        let mut fused: Vec<FusedResult> = Vec::with_capacity(vector.len() + lexical.len());
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(fused.capacity());

        for (index, candidate) in vector.iter().enumerate() {
            let rank = index + 1;
            if positions.contains_key(candidate.id.as_str()) {
                tracing::debug!(id = %candidate.id, rank, "Duplicate id in vector list ignored");
                continue;
            }
            positions.insert(candidate.id.as_str(), fused.len());
            fused.push(FusedResult {
                id: candidate.id.clone(),
                fused_score: self.contribution(rank),
                vector_rank: Some(rank),
                lexical_rank: None,
                attributes: candidate.attributes.clone(),
            });
        }

        for (index, candidate) in lexical.iter().enumerate() {
            let rank = index + 1;
            match positions.get(candidate.id.as_str()).copied() {
                Some(pos) => {
                    let entry = &mut fused[pos];
                    if entry.lexical_rank.is_some() {
                        tracing::debug!(id = %candidate.id, rank, "Duplicate id in lexical list ignored");
                        continue;
                    }
                    entry.fused_score += self.contribution(rank);
                    entry.lexical_rank = Some(rank);
                }
                None => {
                    positions.insert(candidate.id.as_str(), fused.len());
                    fused.push(FusedResult {
                        id: candidate.id.clone(),
                        fused_score: self.contribution(rank),
                        vector_rank: None,
                        lexical_rank: Some(rank),
                        attributes: candidate.attributes.clone(),
                    });
                }
            }
        }

        // sort_by is stable, so equal keys keep first-appearance order
        fused.sort_by(|a, b| {
            b.fused_score
                .total_cmp(&a.fused_score)
                .then_with(|| match (a.in_both(), b.in_both()) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    _ => Ordering::Equal,
                })
        });
        fused
    }

    /// Fuse over the full union, then keep the best `match_count`.
    pub fn fuse_top(
        &self,
        vector: &[CandidateResult],
        lexical: &[CandidateResult],
        match_count: usize,
    ) -> Vec<FusedResult> {
        let mut fused = self.fuse(vector, lexical);
        fused.truncate(match_count);
        fused
    }
}
