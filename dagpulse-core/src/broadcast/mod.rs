//! Push channel: the envelope wire format and the subscriber registry.

mod envelope;
mod hub;

pub use envelope::BroadcastEnvelope;
pub use hub::{BroadcastError, BroadcastHub, PublishReport, Subscription, SubscriberId};
