//! Core types and trait definitions for the Gatehouse premium-content engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.
//!
//! The pieces, leaves first:
//!
//! - [`store`] — the `ContentStore` / `SubscriptionStore` repository traits.
//! - [`access`] — the pure access evaluator.
//! - [`preview`] — bounded previews for denied viewers.
//! - [`schedule`] — single and batch release scheduling.
//! - [`processor`] — the periodic job that graduates due content to free.
//! - [`checker`] — the read path composing the stores with the evaluator.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod checker;
pub mod content;
pub mod error;
pub mod preview;
pub mod processor;
pub mod schedule;
pub mod store;
pub mod subscription;

pub use error::{Error, Result};
