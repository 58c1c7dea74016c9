//! Common types used across the workspace.

pub mod id;


pub use id::*;
