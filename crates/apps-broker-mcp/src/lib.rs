//! MCP server exposing Smart2Go app management tools over JSON-RPC.

pub mod config;
pub mod protocol;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use protocol::ProtocolHandler;
pub use transport::StdioTransport;
