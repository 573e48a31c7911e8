#![forbid(unsafe_code)]

//! Hands-off continuation hooks and fleet poller for autonomous coding agents.
//!
//! The filesystem is the only coordination medium: the hook side
//! ([`continuation`]) and the poller side ([`orchestrator`]) exchange small
//! JSON and `key=value` files through [`persistence`].

use std::future::Future;
use std::pin::Pin;

pub mod audit;
pub mod config;
pub mod continuation;
pub mod errors;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod persistence;
pub mod source;

pub use config::FleetConfig;
pub use errors::{AppError, Result};

/// Boxed `Send` future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
