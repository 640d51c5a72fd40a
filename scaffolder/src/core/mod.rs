//! Deterministic, pure logic shared by the scaffolder.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! values (text, names, mutation descriptions) and return deterministic outputs
//! suitable for tests.

pub mod manifest;
pub mod names;
pub mod rewrite;
pub mod types;
