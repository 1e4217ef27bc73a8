//! # Holos Console Core
//!
//! Shared types for the Holos Console control plane.
//!
//! This crate provides:
//! - The validated-token [`Claims`] record carried through each request
//! - Label and annotation keys of managed tenant objects
//! - The [`Resolver`] mapping logical names to prefixed storage names
//! - The RPC error vocabulary shared by middleware and handlers
//! - An injectable [`Clock`] so grant-window decisions are testable

pub mod claims;
pub mod clock;
pub mod meta;
pub mod resolver;
pub mod rpc;

// Re-export commonly used types for convenience
pub use claims::Claims;
pub use clock::Clock;
pub use meta::ResourceType;
pub use resolver::{Resolver, ResolverError};
pub use rpc::{RpcCode, RpcError};
