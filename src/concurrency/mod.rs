pub mod workspace_lock;

pub use workspace_lock::{WorkspaceLock, WorkspaceLockGuard};
