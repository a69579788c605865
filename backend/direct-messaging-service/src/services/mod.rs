pub mod conversation_service;
pub mod message_service;
pub mod unread_service;

pub use conversation_service::ConversationDirectory;
pub use message_service::{LedgerSettings, MessageLedger};
pub use unread_service::{ConversationUnread, UnreadTracker};

use crate::clock::Clock;
use crate::repository::ChatStore;
use std::sync::Arc;

/// The three services wired over one store and one clock
#[derive(Clone)]
pub struct ChatServices {
    pub directory: ConversationDirectory,
    pub ledger: MessageLedger,
    pub unread: UnreadTracker,
}

impl ChatServices {
    pub fn new(store: Arc<dyn ChatStore>, clock: Arc<dyn Clock>, settings: LedgerSettings) -> Self {
        let directory = ConversationDirectory::new(store.clone(), clock.clone());
        let ledger = MessageLedger::new(store.clone(), directory.clone(), clock, settings);
        let unread = UnreadTracker::new(store, directory.clone());
        Self {
            directory,
            ledger,
            unread,
        }
    }
}
