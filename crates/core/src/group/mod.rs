//! Transaction groups.
//!
//! A group files related transactions under one name. It never widens the
//! atomicity boundary of its members.

pub mod service;
pub mod types;

pub use service::GroupManager;
pub use types::{GroupStatus, TransactionGroup};
