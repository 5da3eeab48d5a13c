//! Live transcript engine.
//!
//! Data frames are folded into [`TranscriptEntry`] snapshots by [`merge`],
//! classified for display by [`classify`], and drive the action panel
//! through [`ActionViewController`]. [`ChatView`] ties these together as a
//! synchronous reducer; [`ChatRuntime`] feeds it from live streams.

pub mod action_view;
pub mod classify;
pub mod merge;
pub mod model;
pub mod runtime;
pub mod view;

pub use action_view::{
    ActionView, ActionViewController, ActionViewKind, Transition, TransitionCause,
};
pub use classify::{ClassifiedTask, ModeFlags, Placement, TaskCategory, TaskView, classify};
pub use merge::merge;
pub use model::{
    EntryOutcome, EventData, FileRef, MessageType, Plan, PlanStep, Task, TranscriptEntry,
};
pub use runtime::ChatRuntime;
pub use view::{ChatEffect, ChatView, QUOTA_NOTICE};
