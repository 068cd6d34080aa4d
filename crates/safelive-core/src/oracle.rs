//! Prediction oracle port and the built-in heuristic scorer
//!
//! The oracle maps free text to a priority label or a completion percentage
//! with a confidence and a provenance tag. The shipping implementation is
//! `HeuristicOracle`, a keyword scorer; a model-backed oracle can sit behind
//! the same trait, and callers fall back to the heuristic whenever a result
//! comes back below [`MIN_ORACLE_CONFIDENCE`].

use crate::status::Priority;
use async_trait::async_trait;

/// Predictions below this confidence are discarded in favor of the
/// heuristic fallback.
pub const MIN_ORACLE_CONFIDENCE: f64 = 0.2;

/// Provenance tags stamped on priority and progress values
pub mod provenance {
    /// Model-backed classification
    pub const ZERO_SHOT_PRETRAINED: &str = "zero_shot_pretrained";
    /// Keyword scorer
    pub const HEURISTIC_FALLBACK: &str = "heuristic_fallback";
    /// The update text itself stated a percentage
    pub const EXPLICIT_PERCENTAGE: &str = "explicit_percentage";
    /// Resolved tickets are pinned at 100
    pub const STATUS_RESOLVED: &str = "status_resolved";
    /// Open tickets with no assigned worker are pinned at 0
    pub const AWAITING_ASSIGNMENT: &str = "awaiting_assignment";
    /// Progress zeroed when department reopened the ticket
    pub const REOPENED_RESET: &str = "reopened_reset";
}

/// Oracle failure; callers degrade to the heuristic path
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Backend model unreachable or not loaded
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Everything the priority scorer may consider
#[derive(Debug, Clone, Default)]
pub struct PriorityInput {
    /// Incident title
    pub title: String,
    /// Incident description
    pub description: String,
    /// Incident category
    pub category: String,
    /// Raw severity label, if the reporter or sensor supplied one
    pub severity: Option<String>,
    /// Raw scope label ("local", "citywide", ...)
    pub scope: Option<String>,
    /// Report source ("citizen", "iot_sensor", ...)
    pub source: Option<String>,
    /// Location text
    pub location: Option<String>,
}

/// Priority label with confidence and provenance
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityPrediction {
    /// Chosen label
    pub priority: Priority,
    /// Confidence in [0, 1], rounded to 4 decimals
    pub confidence: f64,
    /// Which estimation path produced the label
    pub provenance: &'static str,
}

/// Completion percentage with confidence and provenance
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressPrediction {
    /// Percentage, multiple of 5 in [0, 100]
    pub percent: u8,
    /// Confidence in [0, 1], rounded to 4 decimals
    pub confidence: f64,
    /// Which estimation path produced the percentage
    pub provenance: &'static str,
}

/// Black-box priority/progress estimator
#[async_trait]
pub trait PredictionOracle: Send + Sync {
    /// Classify an incident into a priority label
    async fn predict_priority(
        &self,
        input: &PriorityInput,
    ) -> Result<PriorityPrediction, OracleError>;

    /// Estimate completion percentage from a progress update text
    async fn predict_progress(&self, text: &str) -> Result<ProgressPrediction, OracleError>;
}

/// Clamp to [5, 100] and round to the nearest multiple of 5
#[must_use]
pub fn round_step(value: f64) -> u8 {
    let clamped = value.clamp(5.0, 100.0);
    let rounded = ((clamped / 5.0).round() * 5.0) as u8;
    rounded.clamp(5, 100)
}

/// Round a confidence to 4 decimal places in [0, 1]
#[must_use]
pub fn round_confidence(value: f64) -> f64 {
    (value.clamp(0.0, 1.0) * 10_000.0).round() / 10_000.0
}

/// Find the first "NN%" figure in the text, if any. A stated zero
/// still maps to the minimum step of 5.
#[must_use]
pub fn extract_explicit_percent(text: &str) -> Option<u8> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            // reject digits glued to a preceding word or number
            if i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'.') {
                i += 1;
                continue;
            }
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start > 3 {
                continue;
            }
            let mut j = i;
            while j < bytes.len() && bytes[j] == b' ' {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'%' {
                if let Ok(value) = text[start..i].parse::<u32>() {
                    let capped = value.min(100) as f64;
                    if capped <= 0.0 {
                        return Some(5);
                    }
                    return Some(round_step(capped));
                }
            }
        } else {
            i += 1;
        }
    }
    None
}

const LEVELS: [Priority; 4] = [
    Priority::Low,
    Priority::Medium,
    Priority::High,
    Priority::Critical,
];

fn level_index(priority: Priority) -> usize {
    match priority {
        Priority::Low => 0,
        Priority::Medium => 1,
        Priority::High => 2,
        Priority::Critical => 3,
    }
}

const CATEGORY_HINTS: &[(&str, &[(Priority, f64)])] = &[
    ("fire", &[(Priority::Critical, 3.5), (Priority::High, 1.8)]),
    (
        "emergency",
        &[(Priority::Critical, 3.2), (Priority::High, 1.7)],
    ),
    ("crime", &[(Priority::Critical, 2.4), (Priority::High, 2.0)]),
    (
        "medical",
        &[(Priority::Critical, 2.8), (Priority::High, 1.8)],
    ),
    (
        "disaster",
        &[(Priority::Critical, 3.3), (Priority::High, 1.8)],
    ),
    ("traffic", &[(Priority::High, 1.4), (Priority::Medium, 1.0)]),
    ("road", &[(Priority::High, 1.2), (Priority::Medium, 1.0)]),
    (
        "electricity",
        &[(Priority::High, 1.5), (Priority::Medium, 1.0)],
    ),
    ("water", &[(Priority::High, 1.3), (Priority::Medium, 1.2)]),
    (
        "sanitation",
        &[(Priority::Medium, 1.1), (Priority::Low, 1.0)],
    ),
    ("waste", &[(Priority::Medium, 1.1), (Priority::Low, 1.0)]),
    (
        "maintenance",
        &[(Priority::Medium, 1.0), (Priority::Low, 1.1)],
    ),
];

const CRITICAL_KEYWORDS: &[(&str, f64)] = &[
    ("building fire", 3.7),
    ("structure fire", 3.6),
    ("fire", 3.5),
    ("people trapped", 3.2),
    ("explosion", 3.1),
    ("blast", 3.1),
    ("gas leak", 3.0),
    ("electrocution", 3.0),
    ("collapse", 3.1),
    ("not breathing", 3.2),
    ("unconscious", 3.0),
    ("trapped", 3.0),
    ("death", 3.1),
    ("dead", 3.1),
    ("shooting", 3.1),
    ("chemical spill", 3.1),
    ("severe injury", 3.0),
    ("immediate danger", 3.1),
    ("life threatening", 3.2),
    ("mass casualty", 3.2),
    ("cardiac arrest", 3.1),
    ("critical", 2.4),
];

const HIGH_KEYWORDS: &[(&str, f64)] = &[
    ("crash", 2.0),
    ("accident", 1.9),
    ("injured", 2.0),
    ("injury", 1.8),
    ("assault", 2.0),
    ("robbery", 1.9),
    ("road blocked", 1.7),
    ("power outage", 1.8),
    ("water outage", 1.7),
    ("heavy smoke", 2.1),
    ("smoke", 1.8),
    ("flooding", 1.9),
    ("urgent", 1.8),
    ("emergency", 2.0),
    ("dangerous", 1.7),
    ("high risk", 1.9),
];

const MEDIUM_KEYWORDS: &[(&str, f64)] = &[
    ("large pothole", 2.3),
    ("pothole", 2.1),
    ("broken streetlight", 1.8),
    ("streetlight", 1.6),
    ("traffic signal", 1.7),
    ("clogged drainage", 1.8),
    ("drainage", 1.6),
    ("water leak", 1.7),
    ("leak", 1.5),
    ("overflow", 1.7),
    ("garbage pile", 2.0),
    ("garbage", 1.8),
    ("blocked drain", 1.9),
    ("water logging", 1.8),
    ("broken", 1.4),
    ("damaged", 1.4),
];

const LOW_KEYWORDS: &[(&str, f64)] = &[
    ("graffiti", 1.9),
    ("litter", 1.7),
    ("minor", 1.7),
    ("cosmetic", 1.8),
    ("routine", 1.7),
    ("non urgent", 2.0),
    ("informational", 1.8),
    ("suggestion", 1.6),
    ("small", 1.4),
];

const SEVERITY_HINTS: &[(Priority, &[&str])] = &[
    (
        Priority::Critical,
        &[
            "critical",
            "extreme",
            "severe",
            "very high",
            "life-threatening",
            "life threatening",
            "emergency",
        ],
    ),
    (Priority::High, &["high", "major", "urgent"]),
    (Priority::Medium, &["medium", "moderate", "average"]),
    (Priority::Low, &["low", "minor"]),
];

const SCOPE_HINTS: &[(Priority, &[&str])] = &[
    (
        Priority::Critical,
        &["citywide", "statewide", "mass", "widespread"],
    ),
    (
        Priority::High,
        &["multiple", "multi area", "district", "major area"],
    ),
    (Priority::Medium, &["local", "single area", "zone"]),
];

fn normalize_scores(raw: [f64; 4]) -> [f64; 4] {
    let floor = 1e-6;
    let scaled: [f64; 4] = std::array::from_fn(|i| (raw[i].max(0.0) + floor).powf(1.15));
    let total: f64 = scaled.iter().sum();
    if total <= 0.0 {
        return [0.25; 4];
    }
    std::array::from_fn(|i| scaled[i] / total)
}

/// Highest score wins; ties break toward the higher level
fn pick_priority(scores: &[f64; 4]) -> Priority {
    let mut best = Priority::Low;
    for &level in &LEVELS {
        if scores[level_index(level)] >= scores[level_index(best)] {
            best = level;
        }
    }
    best
}

/// Count of people mentioned next to a casualty word, e.g. "3 injured"
fn casualty_count(blob: &str) -> Option<u32> {
    let words: Vec<&str> = blob.split_whitespace().collect();
    for pair in words.windows(2) {
        if let Ok(count) = pair[0].parse::<u32>() {
            let next = pair[1].trim_end_matches(|c: char| !c.is_ascii_alphabetic());
            if matches!(next, "dead" | "injured" | "people" | "victim" | "victims") {
                return Some(count);
            }
        }
    }
    None
}

/// Keyword scorer. Deterministic, never fails, never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicOracle;

impl HeuristicOracle {
    fn priority_scores(input: &PriorityInput) -> [f64; 4] {
        let mut scores = [0.25_f64; 4];
        let blob = [
            input.title.as_str(),
            input.description.as_str(),
            input.category.as_str(),
            input.source.as_deref().unwrap_or(""),
            input.location.as_deref().unwrap_or(""),
        ]
        .join(" ")
        .to_lowercase();

        let category = input.category.trim().to_lowercase();
        for (token, boosts) in CATEGORY_HINTS {
            if category.contains(token) {
                for (priority, boost) in *boosts {
                    scores[level_index(*priority)] += boost;
                }
            }
        }
        if ["fire", "emergency", "disaster"].iter().any(|c| category.contains(c)) {
            scores[level_index(Priority::Critical)] += 2.5;
            let high = level_index(Priority::High);
            scores[high] = (scores[high] - 0.5).max(0.0);
        }

        let tables: [(Priority, &[(&str, f64)]); 4] = [
            (Priority::Critical, CRITICAL_KEYWORDS),
            (Priority::High, HIGH_KEYWORDS),
            (Priority::Medium, MEDIUM_KEYWORDS),
            (Priority::Low, LOW_KEYWORDS),
        ];
        for (priority, terms) in tables {
            for (term, weight) in terms {
                if blob.contains(term) {
                    scores[level_index(priority)] += weight;
                }
            }
        }

        if let Some(severity) = input.severity.as_deref() {
            let severity = severity.trim().to_lowercase();
            if !severity.is_empty() {
                for (priority, aliases) in SEVERITY_HINTS {
                    if aliases.iter().any(|alias| severity.contains(alias)) {
                        let boost = if *priority == Priority::Critical { 3.2 } else { 2.1 };
                        scores[level_index(*priority)] += boost;
                    }
                }
            }
        }

        if let Some(scope) = input.scope.as_deref() {
            let scope = scope.trim().to_lowercase();
            if !scope.is_empty() {
                for (priority, aliases) in SCOPE_HINTS {
                    if aliases.iter().any(|alias| scope.contains(alias)) {
                        let boost = if *priority == Priority::Critical { 2.0 } else { 1.4 };
                        scores[level_index(*priority)] += boost;
                    }
                }
            }
        }

        if let Some(count) = casualty_count(&blob) {
            if count >= 5 {
                scores[level_index(Priority::Critical)] += 3.0;
                scores[level_index(Priority::High)] += 1.5;
            } else if count >= 3 {
                scores[level_index(Priority::Critical)] += 2.5;
                scores[level_index(Priority::High)] += 1.2;
            } else if count >= 1 {
                scores[level_index(Priority::High)] += 1.5;
                scores[level_index(Priority::Critical)] += 0.5;
            }
        }

        if blob.contains("no injury") || blob.contains("minor issue") {
            let critical = level_index(Priority::Critical);
            let high = level_index(Priority::High);
            scores[critical] = (scores[critical] - 1.2).max(0.0);
            scores[high] = (scores[high] - 0.8).max(0.0);
            scores[level_index(Priority::Low)] += 0.8;
        }

        normalize_scores(scores)
    }

    fn progress_score(text: &str) -> (u8, f64) {
        let blob = text.trim().to_lowercase();
        if blob.is_empty() {
            return (5, 0.4);
        }

        let contains_any = |tokens: &[&str]| tokens.iter().any(|t| blob.contains(t));

        let mut score = 5.0_f64;
        let incomplete = contains_any(&[
            "not done",
            "not completed",
            "incomplete",
            "pending",
            "remaining",
        ]);
        if !incomplete
            && contains_any(&["all done", "job done", "completed all", "everything completed"])
        {
            score = score.max(95.0);
        }
        if contains_any(&["fully completed", "completed", "work done", "finished"]) {
            score = score.max(95.0);
        }
        if contains_any(&["verified completed", "all tasks closed", "handover complete"]) {
            score = score.max(100.0);
        }
        if contains_any(&["almost done", "near completion", "final stage"]) {
            score = score.max(85.0);
        }
        if contains_any(&["halfway", "half done", "50 percent"]) {
            score = score.max(50.0);
        }
        if contains_any(&["started", "initial", "site visit", "inspection done"]) {
            score = score.max(15.0);
        }
        if contains_any(&["materials arranged", "procurement complete"]) {
            score = score.max(30.0);
        }
        if contains_any(&["work in progress", "ongoing", "currently working"]) {
            score = score.max(40.0);
        }
        if contains_any(&["delay", "blocked", "waiting", "pending approval"]) {
            score = score.min(35.0);
        }

        (round_step(score), 0.55)
    }
}

#[async_trait]
impl PredictionOracle for HeuristicOracle {
    async fn predict_priority(
        &self,
        input: &PriorityInput,
    ) -> Result<PriorityPrediction, OracleError> {
        let scores = Self::priority_scores(input);
        let chosen = pick_priority(&scores);
        Ok(PriorityPrediction {
            priority: chosen,
            confidence: round_confidence(scores[level_index(chosen)]),
            provenance: provenance::HEURISTIC_FALLBACK,
        })
    }

    async fn predict_progress(&self, text: &str) -> Result<ProgressPrediction, OracleError> {
        if let Some(percent) = extract_explicit_percent(text) {
            return Ok(ProgressPrediction {
                percent,
                confidence: 0.98,
                provenance: provenance::EXPLICIT_PERCENTAGE,
            });
        }
        let (percent, confidence) = Self::progress_score(text);
        Ok(ProgressPrediction {
            percent,
            confidence: round_confidence(confidence),
            provenance: provenance::HEURISTIC_FALLBACK,
        })
    }
}
