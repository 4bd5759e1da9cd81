//! quaver-player library - playback execution process
//!
//! Consumes action messages from the bridge, drives the external engine,
//! and owns the authoritative per-chat playback state.

pub mod api;
pub mod coordinator;
pub mod engine;
pub mod listener;
pub mod resolver;
