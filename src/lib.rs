//! Asset lifecycle engine
//!
//! Tracks tagged IT assets from purchase order to condemnation: tagging from
//! acquisition line items, allocation to employees, reallocation, repair
//! tickets and the admin decision that closes them. Every state change is
//! validated against the transition tables in [`lifecycle`] and committed
//! together with its audit entry.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod lifecycle;
pub mod migrator;
pub mod repositories;
pub mod services;

pub use errors::{ErrorKind, ServiceError};
pub use services::{AppServices, EmployeeInfo};
