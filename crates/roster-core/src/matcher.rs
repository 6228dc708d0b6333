//! Distance-based comparison between a probe embedding and enrolled embeddings.
//!
//! Pure and stateless: nothing here touches storage.

use crate::types::Embedding;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum Euclidean distance accepted as "same person" in the default
/// 128-d embedding space.
pub const DEFAULT_TOLERANCE: f64 = 0.6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Euclidean distance between two embeddings of equal dimension.
pub fn distance(a: &Embedding, b: &Embedding) -> Result<f64, MatchError> {
    if a.dim() != b.dim() {
        return Err(MatchError::DimensionMismatch {
            expected: a.dim(),
            actual: b.dim(),
        });
    }
    Ok(a.values
        .iter()
        .zip(b.values.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt())
}

/// A usable tolerance is finite and not negative. NaN would make every
/// `distance > tolerance` comparison false.
pub fn is_valid_tolerance(tolerance: f64) -> bool {
    tolerance.is_finite() && tolerance >= 0.0
}

/// Parse a tolerance from user input, rejecting NaN, infinities and
/// negative values.
pub fn parse_tolerance(raw: &str) -> Result<f64, String> {
    let tolerance: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("invalid tolerance '{raw}': {e}"))?;
    if !is_valid_tolerance(tolerance) {
        return Err(format!(
            "invalid tolerance '{raw}': must be a finite number >= 0"
        ));
    }
    Ok(tolerance)
}

/// True iff `distance(a, b) <= tolerance`. A NaN tolerance matches nothing.
pub fn is_match(a: &Embedding, b: &Embedding, tolerance: f64) -> Result<bool, MatchError> {
    Ok(distance(a, b)? <= tolerance)
}

/// A candidate accepted by a [`Matcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub name: String,
    pub distance: f64,
}

/// Strategy for picking one candidate out of a gallery.
pub trait Matcher {
    /// Returns the accepted candidate, or `None` when the gallery is empty or
    /// nothing is within `tolerance`.
    fn find_match<'a, I>(
        &self,
        probe: &Embedding,
        candidates: I,
        tolerance: f64,
    ) -> Result<Option<MatchResult>, MatchError>
    where
        I: IntoIterator<Item = (&'a str, &'a Embedding)>;
}

/// Accepts the first candidate (in iteration order) within tolerance.
///
/// Two enrolled faces both within tolerance of the probe resolve to
/// whichever the store yields first.
pub struct FirstMatcher;

impl Matcher for FirstMatcher {
    fn find_match<'a, I>(
        &self,
        probe: &Embedding,
        candidates: I,
        tolerance: f64,
    ) -> Result<Option<MatchResult>, MatchError>
    where
        I: IntoIterator<Item = (&'a str, &'a Embedding)>,
    {
        for (name, embedding) in candidates {
            let d = distance(probe, embedding)?;
            if d <= tolerance {
                return Ok(Some(MatchResult {
                    name: name.to_string(),
                    distance: d,
                }));
            }
        }
        Ok(None)
    }
}

/// Scans the whole gallery and accepts the globally nearest candidate if it
/// is within tolerance. Ties keep the earlier candidate.
pub struct NearestMatcher;

impl Matcher for NearestMatcher {
    fn find_match<'a, I>(
        &self,
        probe: &Embedding,
        candidates: I,
        tolerance: f64,
    ) -> Result<Option<MatchResult>, MatchError>
    where
        I: IntoIterator<Item = (&'a str, &'a Embedding)>,
    {
        let mut best: Option<(&str, f64)> = None;

        for (name, embedding) in candidates {
            let d = distance(probe, embedding)?;
            let is_better = match best {
                None => true,
                Some((_, prev)) => d < prev,
            };
            if is_better {
                best = Some((name, d));
            }
        }

        Ok(match best {
            Some((name, d)) if d <= tolerance => Some(MatchResult {
                name: name.to_string(),
                distance: d,
            }),
            _ => None,
        })
    }
}

/// Configurable selection between [`FirstMatcher`] and [`NearestMatcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    First,
    Nearest,
}

impl MatchPolicy {
    pub fn find_match<'a, I>(
        self,
        probe: &Embedding,
        candidates: I,
        tolerance: f64,
    ) -> Result<Option<MatchResult>, MatchError>
    where
        I: IntoIterator<Item = (&'a str, &'a Embedding)>,
    {
        match self {
            MatchPolicy::First => FirstMatcher.find_match(probe, candidates, tolerance),
            MatchPolicy::Nearest => NearestMatcher.find_match(probe, candidates, tolerance),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::First => f.write_str("first"),
            MatchPolicy::Nearest => f.write_str("nearest"),
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(MatchPolicy::First),
            "nearest" => Ok(MatchPolicy::Nearest),
            other => Err(format!("unknown match policy '{other}' (expected first or nearest)")),
        }
    }
}
