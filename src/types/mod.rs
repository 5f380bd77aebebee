//! Core types for Tessera.

pub mod message;
pub mod tool;

pub use message::*;
pub use tool::*;
