//! Trellis route table tooling.
//!
//! Loads route tables from YAML, registers them into a
//! [`trellis_router::Router`], and describes how requests resolve against
//! the result.

pub mod resolution;
pub mod route_table;

pub use resolution::{resolve, Resolution};
pub use route_table::{RouteSpec, RouteTable, RouteTableError};
