//! Petstore tool catalog + HTTP runtime.
//!
//! This crate is the core of `petstore-mcp`: a statically declared catalog
//! of tools, one per Swagger Petstore endpoint, and the shared runtime that
//! turns each invocation into exactly one HTTP round trip.
//!
//! It intentionally contains **no** transport logic; the stdio MCP surface
//! lives in the `petstore-mcp` binary crate.

pub mod catalog;
pub mod runtime;
