//! Daily briefings: composition, delivery, and demo data.

pub mod composer;
pub mod delivery;
pub mod sample;

pub use composer::{Briefing, compose, compose_at};
pub use delivery::{BriefingDelivery, DeliveryReceipt, LoggingDelivery};
