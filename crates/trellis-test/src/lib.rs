//! Test harness for the Trellis workspace.
//!
//! Drives the `trellis` binary against the route tables in
//! `tests/fixtures/`.

#[cfg(test)]
pub mod cli;
