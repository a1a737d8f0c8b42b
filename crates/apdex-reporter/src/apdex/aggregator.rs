use crate::apdex::{Sample, Tier};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub satisfied: usize,
    pub tolerating: usize,
    pub frustrated: usize,
}

impl TierCounts {
    pub fn tally(samples: &[Sample]) -> Self {
        samples
            .iter()
            .fold(Self::default(), |mut counts, sample| {
                match sample.tier {
                    Tier::Satisfied => counts.satisfied += 1,
                    Tier::Tolerating => counts.tolerating += 1,
                    Tier::Frustrated => counts.frustrated += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> usize {
        self.satisfied + self.tolerating + self.frustrated
    }

    /// `None` when there are no samples at all.
    pub fn score(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }

        Some((self.satisfied as f64 + self.tolerating as f64 / 2.0) / total as f64)
    }
}

/// Apdex of a window snapshot, or `None` if the window held nothing.
pub fn aggregate(samples: &[Sample]) -> Option<f64> {
    TierCounts::tally(samples).score()
}
