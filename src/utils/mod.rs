pub mod config;
pub mod logger;
pub mod settings_toml;

pub use config::*;
pub use logger::{Colors, setup_logging, thread_prefix};
pub use settings_toml::{apply_file_to_settings, load_settings_toml};
