//! Notification scheduling and email payload construction.
//!
//! This crate decides *when* a queued notification should go out and *what*
//! the email collaborator receives; actual transport is external.

pub mod email;
pub mod scheduler;

pub use email::{build_email_payload, EmailPayload};
pub use scheduler::schedule_notification;
