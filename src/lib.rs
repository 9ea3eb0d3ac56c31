pub mod errors;
pub mod result;
pub mod accumulator;
pub mod loader;
pub mod event;
pub mod window;
pub mod files;
pub mod scroll;

pub use accumulator::Accumulator;
pub use loader::{
    BulkLoader,
    LoadSummary,
    LoadTask,
    LoaderConfig,
};
pub use event::{
    ChangeEvent,
    EventChannel,
    SubscriptionId,
};
pub use window::{
    ResetHandle,
    ResetOutcome,
    VirtualWindow,
    WindowConfig,
    WindowCounters,
};
pub use errors::{LoaderError, WindowError};
