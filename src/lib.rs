//! Backend for a link-shared polling app: polls with ordered options, one
//! vote per anonymous session identity, tallies with percentages.
//!
//! The integrity logic lives in [`store::Store`] (SQLite behind a lazily
//! initialized pool); [`service::PollService`] is the validating facade the
//! view layer calls; [`identity::IdentityProvider`] issues the per-session
//! token that gates voting.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;

pub use error::StoreError;
pub use identity::IdentityProvider;
pub use service::PollService;
pub use store::Store;
