//! WebSocket networking: wire protocol, session registry, message
//! routing and the server loop.

pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage};
pub use registry::{SessionRegistry, DEFAULT_PLAYER_CAP};
pub use router::MessageRouter;
pub use server::{now_ms, GameServer, GameServerError, ServerConfig};
