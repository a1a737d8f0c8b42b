pub mod aggregator;
pub mod classifier;
pub mod window;

pub use aggregator::{TierCounts, aggregate};
pub use classifier::{ApdexThreshold, Tier, classify};
pub use window::{Sample, SlidingWindow};
