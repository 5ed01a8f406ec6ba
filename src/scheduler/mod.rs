//! Reminder scheduling
//!
//! Clock, snapshot source and delivery sink are injected so the engine can
//! run against virtual time in tests.

pub mod clock;
pub mod delivery;
pub mod engine;
pub mod source;

pub use clock::{Clock, ClockReading, ManualClock, SystemClock};
pub use delivery::{ChannelSink, DeliverySink, Notification, TracingSink};
pub use engine::{EngineState, SchedulerEngine, TickReport};
pub use source::{OwnerSnapshot, SnapshotSource};
