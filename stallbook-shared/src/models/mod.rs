pub mod events;
pub mod messages;
