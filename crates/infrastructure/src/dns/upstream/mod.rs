pub mod client;
pub mod pool;

pub use client::UpstreamClient;
pub use pool::{UpstreamGroup, UpstreamGroups};
