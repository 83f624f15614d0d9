//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the relay.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data model
//! - `RelayBlueprint` is the validated configuration: one inbound descriptor
//!   plus an ordered list of route descriptors
//! - `StreamSink` is the boundary between the inbound listener and the
//!   fan-out writer owned by the dispatcher

mod blueprint;
mod error;
mod inbound;
mod route;
mod sink;
mod tls;

pub use blueprint::*;
pub use error::*;
pub use inbound::*;
pub use route::*;
pub use sink::*;
pub use tls::*;
