//! DNS Resolution Module
//!
//! The resolution service the predictor dispatches speculative lookups to:
//! - System resolver (getaddrinfo via thread pool)
//! - Async hickory-dns resolver
//! - Hostname-to-IP override table with synchronous answers
//!
//! # Example
//!
//! ```rust,ignore
//! use netpredictor::dns::{Name, Resolve, HickoryResolver};
//!
//! let resolver = HickoryResolver::new();
//! let addrs = resolver.resolve(Name::new("example.com")).await?;
//! ```

mod gai;
mod hickory;
mod resolve;

pub use gai::GaiResolver;
pub use hickory::HickoryResolver;
pub use resolve::{Addrs, DnsResolverWithOverrides, Name, Resolve, Resolving};
