//! portico-resolver - health-aware connection resolution
//!
//! Answers "give me a usable connection for service X now" in two layers:
//! the [`Resolver`] performs one health-filtered registry lookup, picks
//! the first healthy instance, and opens a fresh [`ServiceConnection`];
//! the [`ConnectionCache`] sits above it, keeping at most one live
//! connection per service name, coalescing concurrent first-time
//! resolution, and evicting connections whose calls fail.

pub mod cache;
pub mod connection;
pub mod resolver;

pub use cache::ConnectionCache;
pub use connection::{ConnectionConfig, DownstreamResponse, ServiceConnection};
pub use resolver::{Resolver, ResolverConfig};
