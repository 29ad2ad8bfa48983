//! The four downstream consumers (§4.6), each a distinct process
//! subscribing to exactly one logical topic. Handlers here are pure
//! `Store`/`SidecarBus`-driven functions; each `src/bin/*.rs` entrypoint
//! wires one to an HTTP endpoint the sidecar delivers to.

pub mod audit_writer;
pub mod notifier;
pub mod recurring_materializer;
