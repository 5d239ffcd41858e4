//! Infrastructure layer - external interfaces

pub mod db;
pub mod logging;
