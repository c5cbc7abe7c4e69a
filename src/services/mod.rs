pub mod events;
pub mod poller;
pub mod sync;

pub use events::{Notice, NoticeLevel, SyncEvent};
pub use poller::{Poller, RefreshJob};
pub use sync::{parse_duration, SyncOptions, ToggleOutcome, WorkoutSync};
