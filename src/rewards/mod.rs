pub mod processor;

pub use processor::{ClaimOutcome, RewardClaimProcessor};
