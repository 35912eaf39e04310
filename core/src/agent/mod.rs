pub mod context;
pub mod conversation;
pub mod loop_;
pub mod registry;

pub use context::DirectiveBuilder;
pub use conversation::Conversation;
pub use loop_::{AgentError, AgentLoop};
pub use registry::ToolRegistry;
