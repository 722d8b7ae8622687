//! Questlog Core - Branches, award maps, task records, time keys and errors

pub mod error;
pub mod events;
pub mod lenient;
pub mod task;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use events::*;
pub use task::*;
pub use time::*;
pub use types::*;
