//! Connection sessions and the registry of live sessions.

pub mod connection;
pub mod registry;
pub mod state;

pub use connection::{FrameOutcome, Session};
pub use registry::{SessionInfo, SessionRegistry};
pub use state::SessionState;
