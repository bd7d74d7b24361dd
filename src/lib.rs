pub mod dashboard;
pub mod edit;
pub mod error;
pub mod logs;
pub mod models;
pub mod options;
pub mod panels;
pub mod poller;
pub mod reconcile;
pub mod registry;
pub mod service;
pub mod view;

#[cfg(test)]
mod testing;

#[cfg(target_arch = "wasm32")]
mod wasm_app;

#[cfg(target_arch = "wasm32")]
pub use wasm_app::*;

#[cfg(not(target_arch = "wasm32"))]
pub mod runtime;

#[cfg(not(target_arch = "wasm32"))]
mod template;

#[cfg(not(target_arch = "wasm32"))]
pub use template::{escape_html, render_index};

pub use dashboard::{CycleId, CycleReport, Dashboard, ReadOutcome};
pub use error::{ScanError, ScanResult};
pub use options::{ClientConfig, OverlapPolicy};
