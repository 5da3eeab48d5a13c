//! Session sidebar: recency buckets, sticky headers and the editable list.

pub mod categorize;
pub mod list;
pub mod model;
pub mod sticky;
pub mod store;

pub use categorize::{
    CategorizedSessions, TimeBucket, bucket_for, categorize, format_relative, start_of_day,
};
pub use list::{ConfirmedMutation, MutationOutcome, PendingMutation, SessionList};
pub use model::{Session, SessionStore};
pub use store::JsonFileStore;
pub use sticky::{
    HeaderGeometry, LayoutSource, StickyChange, StickyObserver, StickyTracker, Viewport,
};
