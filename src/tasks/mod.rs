//! Background tasks module
//!
//! This module contains the per-tab task that keeps each widget current.

pub mod tab_driver;

// Re-export main functions
pub use tab_driver::tab_driver_task;
