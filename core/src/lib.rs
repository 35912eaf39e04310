pub mod agent;
pub mod config;
pub mod link;
pub mod providers;
pub mod router;
pub mod state;
pub mod tools;
pub mod traits;

pub use agent::{AgentError, AgentLoop, Conversation, DirectiveBuilder, ToolRegistry};
pub use config::*;
pub use link::*;
pub use providers::*;
pub use router::*;
pub use state::*;
pub use tools::*;
pub use traits::*;
