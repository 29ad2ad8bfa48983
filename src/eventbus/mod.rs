//! Thin, topic-typed façade over the platform pub/sub sidecar (§4.4).
//!
//! Producers call [`SidecarBus::publish`]; consumers poll their own topic
//! subscription endpoint via the sidecar out of band (the façade itself
//! does not run a subscription loop — see `consumers::mod` for how each
//! consumer binary wires a handler to a topic).

pub mod sidecar;
pub mod topics;

pub use sidecar::SidecarBus;
pub use topics::Topic;
