//! Card instances.
//!
//! Card definitions and rules text belong to the embedding game; the timing
//! core only needs the runtime object each action touches.

pub mod instance;

pub use instance::CardInstance;
