pub mod engine;

pub use engine::{RechargeResolution, ResolvedBatch, SettlementEngine};
