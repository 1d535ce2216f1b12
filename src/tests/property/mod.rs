//! Property-based tests
//!
//! Proptest invariants for the chunker: windows reconstruct the input
//! exactly, window sizes respect the configuration, and chunking is
//! deterministic.
