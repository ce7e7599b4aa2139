//! # Shared Bus - Directive Bus for Cross-Instance Coordination
//!
//! Gateway instances address each other by topic. Every instance subscribes
//! to the topic named after its own container identity; peers publish
//! directives (for example `DELETE USER 42`) to that topic when they take over
//! a user's live connection.
//!
//! ```text
//! ┌──────────────┐                     ┌──────────────┐
//! │ Instance B   │  publish(topic=A)   │ Instance A   │
//! │ (new owner)  │ ──────┐             │ (stale owner)│
//! └──────────────┘       │             └──────────────┘
//!                        ▼                     ↑
//!                  ┌──────────────┐            │
//!                  │ Directive    │ ───────────┘
//!                  │ Bus          │  subscribe(topic=A)
//!                  └──────────────┘
//! ```
//!
//! The in-memory bus serves single-process deployments and tests; networked
//! deployments plug a different [`DirectivePublisher`] / [`DirectiveSource`]
//! pair in behind the same traits.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod directive;
pub mod publisher;
pub mod subscriber;

pub use directive::{Directive, DirectiveParseError, TopicMessage};
pub use publisher::{DirectivePublisher, InMemoryDirectiveBus, PublishError};
pub use subscriber::{DirectiveSource, Subscription};

/// Maximum directives buffered per subscriber before lagging ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
