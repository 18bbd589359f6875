//! # girbind Bench
//!
//! Benchmarking utilities for girbind performance testing.

pub mod fixtures;
