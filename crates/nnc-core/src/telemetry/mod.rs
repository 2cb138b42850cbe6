//! Historical metrics: hot/warm/cold tiers, rate math, downsampling.

mod downsample;
mod rate;
mod store;
mod tier;

pub use downsample::downsample;
pub use rate::calculate_rate;
pub use store::{StatsHistory, TelemetryStore, parse_interval};
pub use tier::{Bucket, HotTier, RollupSnapshot, RollupTier, Tier, TierStore};
