//! # Forwarding Gateway Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── session_flow.rs   # Signup, login, forwarding, logout on one instance
//!     ├── ownership.rs      # Two instances contending for one user
//!     └── websocket.rs      # Real sockets against a running runtime
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p fwd-tests
//!
//! # By category
//! cargo test -p fwd-tests integration::ownership
//!
//! # Benchmarks
//! cargo bench -p fwd-tests
//! ```

pub mod integration;
