//! Agent client - talks to the hosted balance-lookup agent
//!
//! This crate is the conversational side of saldo:
//! - Sends prompts to the hosted agent with a stable session id
//! - Renders buffered or streamed replies as they arrive
//! - Provides the `get_balance` tool the agent calls back into
//!
//! # Architecture
//!
//! 1. **Invocation** (`runtime`, `converse`) - one `InvocationBoundary` trait,
//!    two HTTP call shapes behind it. The runtime adapter is the default.
//! 2. **Conversation** (`conversation`) - the read/dispatch/render loop and its
//!    control commands (`/session`, `/new`, `/exit`).
//! 3. **Tools** (`tools`) - `BalanceTool` over the Data API query boundary.
//!
//! # Key Types
//!
//! - `ConversationDriver` - one session's interactive loop
//! - `AgentCoreClient` / `ConverseClient` - invocation adapters
//! - `ToolRegistry` - tools by name
//!
//! The agent owns the conversation; this client never interprets the user's
//! intent itself. Balances come only from the account repository.

pub mod conversation;
pub mod converse;
pub mod runtime;
pub mod tools;

pub use conversation::{ConversationDriver, TurnOutcome};
pub use converse::ConverseClient;
pub use runtime::{
    resolve_runtime_arn, AgentCoreClient, Delivery, Invocation, InvocationBoundary,
    InvocationRequest, InvokeError, RuntimeSettings,
};
pub use tools::{BalanceTool, Tool, ToolRegistry};
