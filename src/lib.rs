//! In-app messaging for mobile host applications: decides whether a tracked event should show a
//! message now, later, or not at all, and hands due messages to the host UI.
//!
//! # Overview
//!
//! The SDK revolves around a [`Client`], created from a [`ClientConfig`]. The host feeds it with
//! three kinds of input:
//!
//! - tracked [events](Event) through [`Client::track()`],
//! - the current [`User`] through [`Client::set_user()`],
//! - the server-provided [`Workspace`](workspace::Workspace) through [`Client::set_workspace()`],
//!
//! and reports its screens through the [`ActivityTracker`](lifecycle::ActivityTracker).
//!
//! A [`Workspace`](workspace::Workspace) is an immutable snapshot of all in-app message
//! campaigns. Whenever configuration changes, it is replaced completely, and every pipeline pass
//! works on a single snapshot.
//!
//! The [`inappmessage`] module contains the delivery pipeline: trigger, schedule, delay, deliver,
//! present. Messages configured with a delay wait on a cancellable timer run by a
//! [`Scheduler`](scheduler::Scheduler). Right before presentation, the pipeline checks again that
//! the app is in the foreground, that the message still exists, and that the user has not changed.
//! When the user changes, pending delayed messages are dropped.
//!
//! Eligibility (status, period, audience, frequency caps) and layout (language and A/B variation)
//! are evaluated by the collaborators in [`evaluation`]. Both can be replaced through
//! [`ClientConfig`].
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum.
//!
//! Tracking and user updates never fail: the pipeline's entry points convert errors into response
//! codes and log them. The returned errors of the inner stages are valuable for debugging and
//! usually indicate that developer's attention is needed.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate with target `inapp`.
//! Consider integrating a `log`-compatible logger implementation for better visibility into
//! SDK operations.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

pub mod clock;
pub mod evaluation;
pub mod inappmessage;
pub mod lifecycle;
pub mod listeners;
pub mod scheduler;
pub mod storage;
pub mod target;
pub mod user;
pub mod workspace;

mod attributes;
mod client;
mod config;
mod error;
mod event;
mod sharder;

#[cfg(test)]
mod test_support;

pub use attributes::{AttributeValue, Attributes};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use event::{Event, UserEvent};
pub use inappmessage::{InAppMessagePresentationContext, InAppMessagePresenter};
pub use lifecycle::HostActivity;
pub use user::User;
