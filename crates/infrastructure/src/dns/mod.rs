pub mod client_lookup;
pub mod endpoint;
pub mod message;
pub mod resolver;
pub mod server;
pub mod transport;
pub mod upstream;

pub use endpoint::UpstreamEndpoint;
