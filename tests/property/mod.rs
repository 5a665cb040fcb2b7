//! Property-based tests for the pipeline's determinism guarantees

mod determinism;
