//! Triage primitives: trace parsing, location extraction, anonymization.
//!
//! Everything in this module is pure and stateless: safe to call from any
//! number of threads, total over arbitrary (attacker-influenced) input.

pub mod anonymize;
pub mod location;
pub mod patterns;
pub mod stepping;

pub use anonymize::{anonymize_output, anonymize_title};
pub use location::{extract_crash_location, extract_hang_location};
pub use stepping::stepping_transcript;
