//! RemoveTube Decision Policy
//!
//! Turns semantic scores into allow/block verdicts.
//!
//! Every source method has a lenient and a strict threshold; strict mode
//! always picks the higher one. The policy never adjusts the reported
//! confidence, it only gates the boolean decision.

pub mod decision;
pub mod threshold;

pub use decision::{DecisionPolicy, DegradedMode, PolicyConfig};
pub use threshold::{ThresholdTable, Thresholds};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::decision::{DecisionPolicy, DegradedMode, PolicyConfig};
    pub use crate::threshold::{ThresholdTable, Thresholds};
}
