//! Scheduled-reminder engine (§4.5): job lifecycle, callback handling, and
//! the synchronous past-due path.

pub mod engine;

pub use engine::ReminderEngine;
