//! Core types and the survey record store for the intake service.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! engines implement [`store::RecordBackend`]; the business rules live in
//! [`intake::SurveyStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod intake;
pub mod record;
pub mod store;

pub use error::{Error, Result};
pub use intake::SurveyStore;
