//! # biseo-store
//!
//! Ephemeral, memory-resident state for the biseo assistant.
//!
//! Nothing here survives a restart.  Confirmation sessions are meant to live
//! for minutes, and conversation context belongs to an outer service.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  SessionStore<P> (DashMap + Clock, TTL) │
//! │  TtlCache<V>     (moka)                 │
//! │  ContextProvider (read-only, per user)  │
//! └─────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod clock;
pub mod context;
pub mod error;
pub mod session;

pub use cache::{CacheStats, TtlCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{
    ContextProvider, ConversationTurn, DocumentContext, ImageContext, InMemoryContext, NoContext,
};
pub use error::{StoreError, StoreResult};
pub use session::{SessionStore, new_session_id};
