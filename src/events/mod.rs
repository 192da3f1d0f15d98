//! Notifications for a presentation layer
//!
//! The engine itself has no UI. Registrations, rating updates and balance
//! results are published through an [`EventPublisher`] for something else
//! to relay.

pub mod publisher;

pub use publisher::{
    publish_event, ChannelEventPublisher, EventPublisher, NoOpEventPublisher,
    TracingEventPublisher,
};
