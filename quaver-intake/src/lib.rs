//! quaver-intake library - command intake process
//!
//! Validates playback commands, writes play requests to the shared queue,
//! and relays control actions to the execution process over the bridge.

pub mod api;
pub mod controller;
