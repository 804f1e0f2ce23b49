//! CLI command implementations.

pub mod backends;
pub mod common;
pub mod consensus;
pub mod echo;
pub mod encode;
pub mod persistent;
pub mod pingpong;
pub mod pipeline;
pub mod relay;
pub mod version;
