//! # netpredictor
//!
//! A Chromium-inspired network predictor for Rust.
//!
//! `netpredictor` guesses which hosts a page is about to need and resolves
//! them before any real request is made, hiding DNS latency. It can also
//! warm up connections for URLs the user is likely to visit next.
//!
//! ## Features
//!
//! - **Speculative DNS**: deduplicated, two-class (rush/background) prefetch queue
//! - **Admission Control**: at most 3 lookups in flight (Chromium-compatible)
//! - **Congestion Control**: stale backlogs are abandoned, not trimmed
//! - **Preconnect**: HSTS-aware URL upgrade with motivation-derived priority
//! - **Pluggable Services**: resolver, connection service and HSTS state are injected
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use netpredictor::predictor::{Predictor, ResolutionMotivation};
//!
//! #[tokio::main]
//! async fn main() {
//!     let predictor = Predictor::builder().build();
//!     predictor.dns_prefetch_list(["static.example.com", "cdn.example.com"]);
//!
//!     let results = predictor.results().await.unwrap();
//!     println!("tracking {} hosts", results.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Core types and error definitions
//! - [`dns`] - Resolution service trait and resolvers
//! - [`predictor`] - Prefetch queue, scheduler and preconnect dispatch
//! - [`socket`] - Connection service interface
//! - [`tls`] - HSTS state

pub mod base;
pub mod dns;
pub mod predictor;
pub mod socket;
pub mod tls;
