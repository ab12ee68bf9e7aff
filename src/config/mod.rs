//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/copyforge/config.toml)
//! 3. Project config (.copyforge/config.toml)
//! 4. Environment variables (COPYFORGE_*, nested keys split on `__`)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
