//! Sync orchestration: gating, skeleton state, error classification and the
//! coordinator that ties them together.

pub mod classify;
pub mod coordinator;
pub mod debounce;
pub mod skeleton;

pub use classify::{ClassifiedError, ErrorClassifier, ErrorKind};
pub use coordinator::{RefreshCoordinator, SyncUiState};
pub use debounce::{SyncDebouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use skeleton::{SkeletonFlags, SkeletonStateManager, Surface};
