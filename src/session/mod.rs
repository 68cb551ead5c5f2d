pub mod cleanup;
pub mod history;
pub mod persistence;
pub mod store;
pub mod types;

pub use cleanup::{SWEEP_INTERVAL_SECS, start_sweep_task, sweep_once};
pub use history::{HISTORY_TTL, HistoryStore};
pub use persistence::FileKvStore;
pub use store::{KvStore, MemoryKvStore, StoreError};
pub use types::{History, MAX_HISTORY_LENGTH, Message, Role, SessionId};
