// Copyright 2026 bonus-steward contributors
// SPDX-License-Identifier: Apache-2.0

//! bonus-steward runtime library: keeps an account's bonus balance near its
//! target by reading the account page, planning the spend and driving it
//! through a browser.
//!
//! This library crate exposes the modules for integration testing.

pub mod cache;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod live;
pub mod locator;
pub mod orchestrator;
pub mod rest;
pub mod summary;
pub mod surface;

pub use config::Config;
pub use error::BonusError;
pub use orchestrator::{run, RunReport};
