//! chronodose - two-dose appointment booker
//!
//! Polls a remote booking service across a list of locations with a pool of
//! workers and books the first two-dose appointment that opens up.
//!
//! # Architecture
//!
//! - [`client`] - Remote service client and the [`client::BookingService`] seam
//! - [`session`] - Shared login session and security token carry-forward
//! - [`booker`] - Settings resolution, poller/booker workers and the orchestrator
//! - [`locations`] - Location file loading
//! - [`models`] - Core data structures and types
//! - [`config`] - Configuration management and settings
//! - [`error`] - Unified error types
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chronodose::booker::{BookingContext, Orchestrator};
//! use chronodose::client::DoctolibClient;
//! use chronodose::config::Config;
//! use chronodose::locations::load_locations;
//! use chronodose::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = DoctolibClient::with_base_url(&config.service.base_url, config.request_timeout())?;
//!     let session = Session::login(
//!         Arc::new(client),
//!         &config.account.username,
//!         &config.account.password,
//!     )
//!     .await?;
//!
//!     let locations = load_locations(&config.booking.locations_file).await?;
//!     let ctx = BookingContext::new(Arc::new(session)).with_pacing(config.poll_interval());
//!     let summary = Orchestrator::new(ctx, locations, config.booking.workers)?.run().await;
//!     println!("booked: {}", summary.is_booked());
//!     Ok(())
//! }
//! ```

pub mod booker;
pub mod client;
pub mod config;
pub mod error;
pub mod locations;
pub mod models;
pub mod session;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::booker::{
        BookingContext, CycleOutcome, Orchestrator, RunSummary, SettingsResolver, StopReason,
        StopSignal, Worker,
    };
    pub use crate::client::{BookingService, DoctolibClient};
    pub use crate::config::Config;
    pub use crate::error::{ChronodoseErrorTrait, Error, ErrorCategory, Result};
    pub use crate::models::{Booking, Location, OfferingSettings, SecurityToken};
    pub use crate::session::Session;
}

// Direct re-exports for convenience
pub use models::{Booking, Location};
