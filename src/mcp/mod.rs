// file: src/mcp/mod.rs
// description: MCP (Model Context Protocol) server for agentic property search
// reference: https://docs.rs/rmcp

pub mod server;
pub mod warmup;

pub use server::{GeocodeRequest, PropertySearchMcp};
pub use warmup::{InferenceWarmup, check_inference_endpoint};
