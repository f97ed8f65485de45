//! Core types, decision logic and trait definitions for slotbook.
//!
//! This crate has no HTTP or database dependencies.
//! Storage backends implement [`store::Repository`]; the presentation layer
//! drives the managers in [`ledger`] and [`registry`] and asks
//! [`reconcile`] for combined views.

// Native `async fn` is used in trait impls.
// Send bounds are spelled out on the trait signatures instead.
#![allow(async_fn_in_trait)]

pub mod admission;
pub mod booking;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod policy;
pub mod reconcile;
pub mod registry;
pub mod session;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
