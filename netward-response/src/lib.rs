//! # Netward Response — graduated enforcement under a safety gate
//!
//! Stage three of the pipeline: confirmed verdicts map deterministically
//! to one concrete action; pre-confirmation candidates must pass a strict
//! four-condition safety gate first; and every active enforcement carries
//! a TTL after which an independent sweep reverts it.

pub mod engine;
pub mod expiry;
pub mod gate;
pub mod types;

#[cfg(test)]
mod tests;

pub use engine::{CommandRunner, EnforcementDecisionEngine, RecordingRunner, ShellRunner};
pub use expiry::AutoExpiryScheduler;
pub use gate::SafetyGate;
pub use types::{EnforcementReport, GateDecision, PreemptiveCandidate, Verdict};
