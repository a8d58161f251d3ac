//! Per-chat state storage on top of teloxide's in-memory dialogue storage.

use std::sync::Arc;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage, InMemStorageError};
use teloxide::types::ChatId;
use tracing::debug;

use super::state::DialogueState;

/// Type alias for a single chat's dialogue handle
pub type ChatDialogue = Dialogue<DialogueState, InMemStorage<DialogueState>>;

/// State of every active chat
///
/// A chat without an entry is on the main menu, so returning home removes the
/// entry instead of storing the default.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<InMemStorage<DialogueState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            storage: InMemStorage::new(),
        }
    }

    pub fn dialogue(&self, chat_id: ChatId) -> ChatDialogue {
        Dialogue::new(self.storage.clone(), chat_id)
    }

    /// Current state, the main menu when nothing is stored
    pub async fn get(&self, chat_id: ChatId) -> DialogueState {
        match self.dialogue(chat_id).get().await {
            Ok(state) => state.unwrap_or_default(),
            // In-memory storage never fails a read
            Err(_) => DialogueState::default(),
        }
    }

    pub async fn replace(&self, chat_id: ChatId, state: DialogueState) {
        // Infallible for InMemStorage
        let _ = self.dialogue(chat_id).update(state).await;
    }

    pub async fn clear(&self, chat_id: ChatId) {
        // Nothing stored means the chat is already on the main menu
        if let Err(InMemStorageError::DialogueNotFound) = self.dialogue(chat_id).exit().await {
            debug!(chat_id = %chat_id, "No stored dialogue to clear");
        }
    }

    /// Store `state`, dropping the entry for the main menu
    pub async fn save(&self, chat_id: ChatId, state: DialogueState) {
        if state.is_main_menu() {
            self.clear(chat_id).await;
        } else {
            self.replace(chat_id, state).await;
        }
    }
}
