//! C7 Tool Factory & Dispatcher and C8 RPC Frame Handler: turns a
//! [`gateway_core::GatewayCore`] into the two RPC surfaces the gateway
//! exposes — line-delimited JSON-RPC over stdio, and SSE+HTTP POST (spec
//! §4.7, §4.8, §6).

pub mod dispatcher;
pub mod envelope;
pub mod jsonrpc;
pub mod sse;
pub mod stdio;
pub mod tools;
pub mod validate;

pub use dispatcher::Dispatcher;
pub use envelope::{ContentEnvelope, ContentItem};
pub use tools::{ToolDescriptor, ToolKind};
