//! Connection establishment interface.
//!
//! Mirrors the part of Chromium's `net/socket/` the predictor talks to:
//! - [`preconnect`]: `Preconnect` service and its request/priority types

pub mod preconnect;

pub use preconnect::{NoPreconnect, Preconnect, PreconnectRequest, RequestPriority};
