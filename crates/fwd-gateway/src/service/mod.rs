//! Gateway services: connection acceptance, the per-connection loops,
//! ownership conflict resolution and the directive listener.

mod conflict;
pub mod directives;
pub mod gateway;
pub mod session;

pub use directives::{run_directive_listener, spawn_directive_listener};
pub use gateway::{ConnectionTasks, Gateway, GatewayDependencies};
pub use session::{SessionState, LOGIN_UNAVAILABLE};
