//! The minimal REST write surface (§6, SPEC_FULL §1 addendum): task CRUD
//! over HTTP, the concrete producer of `task-events`/`task-updates` the
//! rest of the core only ever consumes.

pub mod routes;

pub use routes::{rest_writer_router, RestWriterState};
