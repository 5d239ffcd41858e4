//! Operations exposed by the core

pub mod canvas_sync;
