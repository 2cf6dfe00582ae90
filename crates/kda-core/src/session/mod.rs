//! Session lifecycle: types, SQLite persistence, and the manager.

pub mod manager;
pub mod store;
pub mod types;

pub use manager::SessionManager;
pub use store::SessionStore;
pub use types::{
    is_supported_language, ChatTurn, JourneyStage, Role, Session, SessionPatch, TurnRole,
    SUPPORTED_LANGUAGES,
};
