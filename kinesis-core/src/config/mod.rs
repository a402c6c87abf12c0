//! Configuration types
//!
//! Board-agnostic machine configuration, serializable with postcard.

pub mod machine;

pub use machine::*;
