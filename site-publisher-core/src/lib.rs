#![doc = "site-publisher-core: core logic library for site-publisher."]

//! This crate mirrors a local folder onto a remote hierarchical content store.
//! It holds the hierarchy builder, the batched publishing engine and the job
//! driver; no HTTP code lives here.
//!
//! # Usage
//! Build a [`session::RemoteSession`] around any [`contract::RemoteStore`],
//! then call [`publish::publish_folder`] per job, or [`jobs::publish_jobs`]
//! for a whole [`config::PublishConfig`].

pub mod config;
pub mod contract;
pub mod error;
pub mod hierarchy;
pub mod jobs;
pub mod memory;
pub mod publish;
pub mod session;

pub use error::{PublishError, Result};
