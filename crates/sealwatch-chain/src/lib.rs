//! Read-only chain access for sealwatch
//!
//! `ChainClient` is the seam between the scanner and a deployment: the
//! JSON-RPC implementation talks to a live node, the scripted one backs
//! the tests.

pub mod client;
pub mod rpc;
pub mod scripted;

pub use client::{ChainClient, ChainError, Result};
pub use rpc::HttpChainClient;
pub use scripted::ScriptedChain;
