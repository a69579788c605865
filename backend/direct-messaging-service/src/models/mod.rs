pub mod conversation;
pub mod message;
pub mod role;

pub use conversation::{Conversation, ParticipantPair};
pub use message::{Message, MessagePayload};
pub use role::{Principal, UserRole};
