//! Conversation flow: per-chat state, the pure transition function, message
//! rendering and state storage.

pub mod render;
pub mod state;
pub mod store;
pub mod transition;

pub use render::{Outbound, OutboundText, ReplyKeyboard, TextFormat};
pub use state::{DialogueState, ImageType};
pub use store::{ChatDialogue, SessionStore};
pub use transition::{transition, DialogueContext, Event, Request, Transition, EXPLAIN_LOOP_GRADE};
