//! Message pipeline.
//!
//! Every inbound message, whatever its provider, flows through:
//! 1. `normalizer::normalize()`: provider record to `NormalizedMessage`, no I/O
//! 2. `MessageClassifier::analyze()`: LLM verdict coerced into an `Analysis`
//! 3. `ClassifiedMessage`: the pair handed to task promotion and briefings
//!
//! Classification failures degrade to a fixed INFO analysis unless the
//! classifier is configured to propagate them.

pub mod analysis;
pub mod classifier;
pub mod normalizer;
pub mod throttle;
pub mod types;
