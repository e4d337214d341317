//! # nestshed parallel
//!
//! Processing modes for independent units of work (one per outlet label).
//!
//! Work is mapped over an index range and results come back in index order
//! whatever the mode, so callers get deterministic output. Without the
//! `parallel` feature every mode runs sequentially.

pub mod strategy;

pub use strategy::{num_cpus, ParallelStrategy, ProcessingMode};
