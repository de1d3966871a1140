//! CLI command implementations

mod cast;
mod config;
mod list;

pub use cast::{cast, CastArgs};
pub use config::{config, ConfigArgs};
pub use list::list;
