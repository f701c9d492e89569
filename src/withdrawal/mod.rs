pub mod eligibility;
pub mod processor;

pub use eligibility::{EligibilityDecision, EligibilityGate};
pub use processor::WithdrawalProcessor;
