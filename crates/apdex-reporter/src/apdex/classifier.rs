use std::fmt;

/// Experience bucket of a single user action, ordered by increasing dissatisfaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Satisfied,
    Tolerating,
    Frustrated,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tier::Satisfied => "satisfied",
            Tier::Tolerating => "tolerating",
            Tier::Frustrated => "frustrated",
        };
        f.write_str(label)
    }
}

/// Satisfaction threshold `T` in milliseconds. Fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApdexThreshold(u64);

impl ApdexThreshold {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn classify(&self, response_time: u64) -> Tier {
        classify(response_time, self.0)
    }
}

/// Satisfied below `T`, tolerating below `4T`, frustrated otherwise.
pub fn classify(response_time: u64, target_millis: u64) -> Tier {
    if response_time < target_millis {
        Tier::Satisfied
    } else if response_time < target_millis.saturating_mul(4) {
        Tier::Tolerating
    } else {
        Tier::Frustrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        let t = 1000;
        assert_eq!(classify(0, t), Tier::Satisfied);
        assert_eq!(classify(999, t), Tier::Satisfied);
        assert_eq!(classify(1000, t), Tier::Tolerating);
        assert_eq!(classify(3999, t), Tier::Tolerating);
        assert_eq!(classify(4000, t), Tier::Frustrated);
        assert_eq!(classify(u64::MAX, t), Tier::Frustrated);
    }

    #[test]
    fn test_classify_zero_threshold() {
        // Nothing is ever fast enough
        assert_eq!(classify(0, 0), Tier::Frustrated);
        assert_eq!(classify(10, 0), Tier::Frustrated);
    }

    #[test]
    fn test_classify_huge_threshold_does_not_overflow() {
        let t = u64::MAX / 2;
        assert_eq!(classify(t, t), Tier::Tolerating);
        assert_eq!(classify(u64::MAX - 1, t), Tier::Tolerating);
    }

    #[test]
    fn test_threshold_from_secs() {
        let threshold = ApdexThreshold::from_secs(2);
        assert_eq!(threshold.as_millis(), 2000);
        assert_eq!(threshold.classify(1999), Tier::Satisfied);
        assert_eq!(threshold.classify(2000), Tier::Tolerating);
        assert_eq!(threshold.classify(8000), Tier::Frustrated);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Satisfied < Tier::Tolerating);
        assert!(Tier::Tolerating < Tier::Frustrated);
    }
}
