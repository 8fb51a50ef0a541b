// crates/core/src/lib.rs
pub mod actions;
pub mod config;
pub mod notify;
pub mod types;

pub use actions::*;
pub use config::*;
pub use notify::*;
pub use types::*;
