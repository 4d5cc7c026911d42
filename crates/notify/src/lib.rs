//! Email delivery for reminder notifications.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - SMTP email notifier implementation via lettre
//! - Minijinja template rendering for the digest and reminder emails

pub mod email;
pub mod templating;
pub mod traits;

pub use email::EmailNotifier;
pub use traits::{Email, Notifier, NotifyError};
