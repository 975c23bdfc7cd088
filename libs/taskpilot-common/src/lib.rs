//! TaskPilot Common - Shared constants and utilities
//!
//! # Examples
//!
//! ```
//! use taskpilot_common::{truncate_string, DEFAULT_CACHE_NAMESPACE};
//!
//! assert_eq!(DEFAULT_CACHE_NAMESPACE, "ai_cache");
//! assert_eq!(truncate_string("hello world", 5), "he...");
//! ```

pub mod constants;
pub mod utils;

pub use constants::*;
pub use utils::*;
