use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Wall-clock duration of one cascade stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Per-stage timings of a single pipeline run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn with_total(total_ms: f64) -> Self {
        Self {
            total_ms,
            stages: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming::new(label, elapsed_ms));
    }

    /// Run `f`, recording its duration under `label`.
    pub fn time<T>(&mut self, label: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.push(label, elapsed_ms(start));
        out
    }

    pub fn stage_ms(&self, label: &str) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.elapsed_ms)
    }

    /// Sum stage durations by label across runs, keeping first-seen order.
    pub fn accumulate(&mut self, other: &TimingBreakdown) {
        self.total_ms += other.total_ms;
        for stage in &other.stages {
            match self.stages.iter_mut().find(|s| s.label == stage.label) {
                Some(s) => s.elapsed_ms += stage.elapsed_ms,
                None => self.stages.push(stage.clone()),
            }
        }
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_merges_by_label() {
        let mut a = TimingBreakdown::with_total(3.0);
        a.push("coarse", 2.0);
        a.push("refine", 1.0);
        let mut b = TimingBreakdown::with_total(4.0);
        b.push("refine", 1.5);
        b.push("prompt", 0.5);
        b.push("coarse", 2.0);
        a.accumulate(&b);
        assert_eq!(a.total_ms, 7.0);
        assert_eq!(a.stage_ms("coarse"), Some(4.0));
        assert_eq!(a.stage_ms("refine"), Some(2.5));
        assert_eq!(a.stage_ms("prompt"), Some(0.5));
        assert_eq!(a.stages.len(), 3);
    }
}
