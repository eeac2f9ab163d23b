pub mod channels;
pub mod dispatcher;
pub mod hub;
pub mod types;

pub use channels::{DeliveryChannel, OutboxChannel, OutboxStore, RealtimeChannel};
pub use dispatcher::{AlertNotifier, NotificationDispatcher, RecipientDirectory};
pub use hub::{PushGateway, SessionHub};
pub use types::*;
