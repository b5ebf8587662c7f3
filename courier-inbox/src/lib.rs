//! # Courier Inbox
//!
//! The client-side notification inbox: a bounded, de-duplicated local
//! store fed by the realtime change feed, a delivery pipeline actor that
//! applies events in arrival order and triggers toast presentation, and
//! the read-state writer that propagates mark-as-read commands to the
//! backend.
//!
//! The [`NotificationCenter`] ties everything to the active recipient
//! identity: it opens and closes the feed subscription on identity
//! changes and guarantees teardown on every exit path.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]

mod center;
mod pipeline;
mod read_state;
mod store;
mod toast;

pub use center::NotificationCenter;
pub use pipeline::{DeliveryPipeline, PipelineCommand, PipelineHandle};
pub use read_state::ReadStateWriter;
pub use store::Inbox;
pub use toast::{Banner, BannerPhase, ToastManager};
