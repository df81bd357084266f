pub mod config;
pub mod drift;
pub mod error;
pub mod graph;
pub mod history;
pub mod intent;
pub mod io;
pub mod paths;
pub mod plan;
pub mod trace;

pub use error::{Result, WaveplanError};
