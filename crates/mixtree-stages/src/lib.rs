//! Processing stages and stage registry for mixtree.
//!
//! This crate provides the concrete [`ProcessingStage`](mixtree_core::ProcessingStage)
//! implementations that config files can name, and a registry that builds
//! them from their JSON config.
//!
//! # Stages
//!
//! | Id | Type | Config |
//! |----|------|--------|
//! | `governor` | [`Governor`] | `onset_volume`, `clamp_multiplier` |
//! | `gain` | [`Gain`] | `gain` |
//! | `delay` | [`Delay`] | `delay_ms` |
//!
//! # Example
//!
//! ```rust
//! use mixtree_stages::StageRegistry;
//! use serde_json::json;
//!
//! let registry = StageRegistry::new();
//! for stage in registry.all_stages() {
//!     println!("{}: {}", stage.id, stage.description);
//! }
//!
//! let config = json!({"onset_volume": 0.9, "clamp_multiplier": 0.6});
//! let governor = registry.create("governor", &config, 2).unwrap();
//! assert_eq!(governor.name(), "governor");
//! ```

pub mod delay;
pub mod error;
pub mod gain;
pub mod governor;
pub mod registry;

pub use delay::{DELAY_ID, Delay, MAX_DELAY_MS};
pub use error::StageError;
pub use gain::{GAIN_ID, Gain};
pub use governor::{GOVERNOR_ID, Governor};
pub use registry::{StageDescriptor, StageFactory, StageRegistry};
