use curator_common::config::EvaluationConfig;
use curator_common::Evaluation;

/// Decides whether a batch was good enough to keep searching as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGate {
    pub threshold: f64,
    pub min_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateVerdict {
    pub high_confidence_count: usize,
    pub passed: bool,
}

impl QualityGate {
    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self {
            threshold: config.high_confidence,
            min_count: config.min_high_confidence,
        }
    }

    pub fn is_candidate(&self, evaluation: &Evaluation) -> bool {
        evaluation.confidence >= self.threshold
    }

    pub fn assess(&self, evaluations: &[Evaluation]) -> GateVerdict {
        let high_confidence_count = evaluations.iter().filter(|e| self.is_candidate(e)).count();
        GateVerdict {
            high_confidence_count,
            passed: high_confidence_count >= self.min_count,
        }
    }

    /// Evaluations that qualify as candidates, in batch order.
    pub fn accepted(&self, evaluations: &[Evaluation]) -> Vec<Evaluation> {
        evaluations
            .iter()
            .filter(|e| self.is_candidate(e))
            .cloned()
            .collect()
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::from_config(&EvaluationConfig::default())
    }
}
