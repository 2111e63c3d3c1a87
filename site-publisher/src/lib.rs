pub mod cli;
pub mod load_config;
pub mod sharepoint;

pub use cli::{run, Cli, Commands};
