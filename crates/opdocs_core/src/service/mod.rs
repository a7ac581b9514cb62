//! Use-case services above the remote client.

pub mod feature;
pub mod save;
