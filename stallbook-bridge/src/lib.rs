pub mod correlator;
pub mod request;
pub mod notify;
pub mod identity;
pub mod memory;

pub use correlator::{Correlator, ReplyOutcome};
pub use request::{BridgeError, RequestBridge};
pub use notify::{NotificationDispatcher, OutboxDispatcher};
pub use identity::{IdentityClient, StaticIdentityGateway};
pub use memory::InMemoryBus;
