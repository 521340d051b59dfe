//! Tool hosts: what the assistant loop calls when the model asks for a tool.

pub mod errors;
mod host;
mod map_host;

pub use errors::ToolError;
pub use host::{Timed, ToolHost};
pub use map_host::MapToolHost;
