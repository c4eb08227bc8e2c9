// SPDX-License-Identifier: MIT

// Certificate generation and trust bundle distribution for admission and
// conversion webhooks. The binary in main.rs only parses arguments, builds
// the Kubernetes client and hands over to `create::run` or `patch::run`.

pub mod certs;
pub mod config;
pub mod create;
pub mod crd;
mod error;
pub mod patch;
pub mod trust_store;
pub mod webhook;

#[cfg(test)]
mod mock_client;

pub use error::{Error, Result};
