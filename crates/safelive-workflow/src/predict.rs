//! Oracle invocation with the heuristic fallback policy

use safelive_core::oracle::{
    provenance, HeuristicOracle, PredictionOracle, PriorityInput, PriorityPrediction,
    ProgressPrediction, MIN_ORACLE_CONFIDENCE,
};
use safelive_core::Priority;

/// Ask the configured oracle for a priority label, degrading to the keyword
/// scorer when it fails or answers below the confidence floor.
pub(crate) async fn priority_with_fallback(
    oracle: &dyn PredictionOracle,
    input: &PriorityInput,
) -> PriorityPrediction {
    match oracle.predict_priority(input).await {
        Ok(prediction) if prediction.confidence >= MIN_ORACLE_CONFIDENCE => prediction,
        Ok(prediction) => {
            tracing::debug!(
                confidence = prediction.confidence,
                "discarding low-confidence priority prediction"
            );
            heuristic_priority(input).await
        }
        Err(error) => {
            tracing::warn!(%error, "priority oracle unavailable");
            heuristic_priority(input).await
        }
    }
}

async fn heuristic_priority(input: &PriorityInput) -> PriorityPrediction {
    match HeuristicOracle.predict_priority(input).await {
        Ok(prediction) => prediction,
        Err(error) => {
            tracing::error!(%error, "keyword scorer failed");
            PriorityPrediction {
                priority: Priority::Medium,
                confidence: 0.3,
                provenance: provenance::HEURISTIC_FALLBACK,
            }
        }
    }
}

/// Same policy for progress estimation.
pub(crate) async fn progress_with_fallback(
    oracle: &dyn PredictionOracle,
    text: &str,
) -> ProgressPrediction {
    match oracle.predict_progress(text).await {
        Ok(prediction) if prediction.confidence >= MIN_ORACLE_CONFIDENCE => prediction,
        Ok(prediction) => {
            tracing::debug!(
                confidence = prediction.confidence,
                "discarding low-confidence progress prediction"
            );
            heuristic_progress(text).await
        }
        Err(error) => {
            tracing::warn!(%error, "progress oracle unavailable");
            heuristic_progress(text).await
        }
    }
}

async fn heuristic_progress(text: &str) -> ProgressPrediction {
    match HeuristicOracle.predict_progress(text).await {
        Ok(prediction) => prediction,
        Err(error) => {
            tracing::error!(%error, "keyword scorer failed");
            ProgressPrediction {
                percent: 5,
                confidence: 0.3,
                provenance: provenance::HEURISTIC_FALLBACK,
            }
        }
    }
}
