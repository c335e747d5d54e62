//! encore-core library.
//!
//! Client-side state engine for a personal ticket archive: staged edits over
//! canonical records, server-trusting like toggles, "Nth visit" ordinals and
//! the time-window/search filters behind the archive views.
//!
//! # Conventions
//!
//! - **Errors**: [`CoreError`] for engine operations, `anyhow::Result` for
//!   config loading and collaborator transport.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod archive;
pub mod collection;
pub mod config;
pub mod edit;
pub mod engagement;
pub mod error;
pub mod filter;
pub mod model;
pub mod ordinal;
pub mod search;
pub mod service;
pub mod session;

pub use error::{CoreError, ValidationError};
pub use model::ticket::{
    EngagementState, Genre, GenreCode, Review, Ticket, TicketPatch, Visibility,
};
