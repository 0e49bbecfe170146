//! Decoded analysis result.

use serde::Deserialize;

/// Structured result decoded from the vision model's free-text answer.
///
/// Produced only by a strict decode of the extracted JSON object; a missing or
/// malformed field fails the decode rather than yielding a partial value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisResult {
    /// Identified mushroom species.
    pub species_name: String,
    /// Brief introduction to the species.
    pub introduction: String,
    /// Growth stage and health assessment.
    pub growth_analysis: String,
}
