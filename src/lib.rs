//! Client-side data layer of the BlogSpace publishing client.
//!
//! [`bootstrap::Bootstrap`] builds one [`services::session::SessionStore`] and one
//! [`services::content::ContentStore`] over a [`adapters::backend::Backend`]; front
//! ends read state from the stores, call their mutators and listen to
//! [`services::notification::Notifier`] for user-visible messages.

pub mod adapters;
pub mod bootstrap;
pub mod config;
pub mod dependencies;
pub mod domain;
pub mod services;
