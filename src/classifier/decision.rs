//! Turning per-category scores into a single verdict.
//!
//! Categories are always scored in ascending order and a category only
//! replaces the current best when its score is strictly greater. The running
//! maximum starts at 0.0, so a category scoring exactly 0.0 never wins, and
//! when two categories tie the lexicographically smallest one is kept.

use serde::Serialize;

/// The score a classifier assigned to one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: f64,
}

impl CategoryScore {
    pub fn new<S: Into<String>>(category: S, score: f64) -> Self {
        CategoryScore {
            category: category.into(),
            score,
        }
    }
}

/// Why a decision fell back to the caller's default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum Fallback {
    /// No category scored above zero and its minimum.
    NoCandidate,
    /// A competitor came within the best category's threshold.
    Ambiguous { best: String, competitor: String },
}

/// The outcome of one classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// The chosen category, or the caller's default.
    pub verdict: String,
    /// Set when `verdict` is the default.
    pub fallback: Option<Fallback>,
    /// Every category's score, in ascending category order.
    pub scores: Vec<CategoryScore>,
}

impl Decision {
    pub fn chosen(category: String, scores: Vec<CategoryScore>) -> Self {
        Decision {
            verdict: category,
            fallback: None,
            scores,
        }
    }

    pub fn fallback(default: &str, fallback: Fallback, scores: Vec<CategoryScore>) -> Self {
        Decision {
            verdict: default.to_string(),
            fallback: Some(fallback),
            scores,
        }
    }

    pub fn is_default(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Pick the strictly greatest positive score among eligible categories.
pub fn select_best<F>(scores: &[CategoryScore], mut eligible: F) -> Option<&CategoryScore>
where
    F: FnMut(&CategoryScore) -> bool,
{
    let mut best = None;
    let mut max = 0.0;
    for candidate in scores {
        if candidate.score > max && eligible(candidate) {
            max = candidate.score;
            best = Some(candidate);
        }
    }
    best
}

/// Find a category other than `best` whose score, scaled by `threshold`,
/// exceeds the best score.
pub fn find_competitor<'a>(
    scores: &'a [CategoryScore],
    best: &CategoryScore,
    threshold: f64,
) -> Option<&'a CategoryScore> {
    scores
        .iter()
        .filter(|other| other.category != best.category)
        .find(|other| other.score * threshold > best.score)
}
