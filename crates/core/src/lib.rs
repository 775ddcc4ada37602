#![forbid(unsafe_code)]

//! Domain model and pure rules for the quiz session engine.
//!
//! Nothing in this crate performs I/O: catalog entities are validated on
//! construction, and scoring is a pure function over counts.

pub mod model;
pub mod scoring;
pub mod time;

pub use time::Clock;
