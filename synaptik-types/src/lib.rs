//! Synaptik Types
//!
//! Shared type definitions for chat content, execution settings, and
//! memory records used across all Synaptik connector crates.

pub mod content;
pub mod error;
pub mod memory;
pub mod settings;

pub use content::*;
pub use error::*;
pub use memory::*;
pub use settings::*;
