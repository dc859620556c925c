//! The resolution pipeline: a fixed, linear chain of decision stages.
//!
//! Each stage either answers (terminal) or delegates to the stage it wraps.
//! Composition is decorator-style, assembled once by `ResolverBuilder`; the
//! per-query hot path is a plain chain of async calls over immutable state.

pub mod blocking;
pub mod builder;
pub mod caching;
pub mod client_name;
pub mod conditional;
pub mod custom_dns;
pub mod fqdn_filter;
pub mod hosts_file;
pub mod query_log;
pub mod query_type_filter;
pub mod special_name;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use blocking::BlockingResolver;
pub use builder::{ResolverBuilder, ResolverChain};
pub use caching::CachingResolver;
pub use client_name::ClientNameResolver;
pub use conditional::ConditionalResolver;
pub use custom_dns::CustomDnsResolver;
pub use fqdn_filter::FqdnFilterResolver;
pub use hosts_file::HostsFileResolver;
pub use query_log::QueryLogResolver;
pub use query_type_filter::QueryTypeFilterResolver;
pub use special_name::SpecialNameResolver;
pub use upstream::UpstreamResolver;
