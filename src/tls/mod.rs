//! Transport security state consulted before preconnecting.

pub mod hsts;

pub use hsts::{HstsStore, TransportSecurity};
