//! # Courier Feed
//!
//! Change-feed client for the Courier notification pipeline.
//!
//! Opens one live subscription per active recipient to the backend's
//! realtime channel, decodes row-change frames into [`ChangeEvent`]s, and
//! forwards them to the delivery pipeline in arrival order. Successive
//! `open()` calls use a monotonically increasing subscription generation so
//! in-flight events from a torn-down subscription can never cross into the
//! next one.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]

mod client;
mod message;
mod socket;
mod state;

pub use client::FeedClient;
pub use message::{ChangeEvent, ChangeKind, Envelope};
pub use state::FeedState;
