mod activity;
mod client;

pub use activity::{ActivityEvent, ActivityStream};
pub use client::{
    ArchiveClient, ArchiveError, ArchiveInfo, DirEntry, EntryKind, EntryStat, HistoryEntry,
    HistoryOp, ListOptions, ManifestUpdate, UserSettings,
};
