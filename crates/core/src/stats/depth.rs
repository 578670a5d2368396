//! Depth distribution of synthesized trees.

use serde::Serialize;

use crate::models::AstSample;

/// Samples at or above one depth threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthThreshold {
    pub depth: u32,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepthStats {
    pub total: usize,
    /// One entry per threshold in `2..=max depth`.
    pub distribution: Vec<DepthThreshold>,
    /// First sample of maximal depth.
    pub max_by_depth: Option<AstSample>,
    /// First sample of maximal size.
    pub max_by_size: Option<AstSample>,
}

/// First element maximizing `key`.
fn first_max_by<K: Ord>(samples: &[AstSample], key: impl Fn(&AstSample) -> K) -> Option<AstSample> {
    samples.iter().copied().fold(None, |best, s| match best {
        Some(b) if key(&b) >= key(&s) => Some(b),
        _ => Some(s),
    })
}

pub fn depth_stats(samples: &[AstSample]) -> DepthStats {
    let max_by_depth = first_max_by(samples, |s| s.depth);
    let Some(max_depth) = max_by_depth.map(|s| s.depth) else {
        return DepthStats::default();
    };

    let total = samples.len();
    let distribution = (2..=max_depth)
        .map(|depth| {
            let count = samples.iter().filter(|s| s.depth >= depth).count();
            DepthThreshold {
                depth,
                count,
                percentage: 100.0 * count as f64 / total as f64,
            }
        })
        .collect();

    DepthStats {
        total,
        distribution,
        max_by_depth,
        max_by_size: first_max_by(samples, |s| s.size),
    }
}
