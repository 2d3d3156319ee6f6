//! Moodjournal: journal entries with mood tagging, emotion classification,
//! and generated insights.
//!
//! Entries live in a hosted row store with a local key-value fallback. The
//! [`sync::JournalEngine`] decides per call which store serves it, falls back
//! to local storage when the remote store is unavailable, and tags every
//! result with its provenance.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod entry;
pub mod logging;
pub mod principal;
pub mod providers;
pub mod store;
pub mod sync;
