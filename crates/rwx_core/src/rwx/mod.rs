//! RWX (RenderWare script) support.
//!
//! This module turns RWX text into the crate's scene graph in a single
//! forward pass:
//!
//! - [`grammar`] maps each line to a [`Command`]
//! - [`TransformStack`] tracks clump scopes and `transformbegin` saves
//! - [`MaterialRegistry`] deduplicates materials and assigns mesh slots
//! - [`GeometryAccumulator`] collects vertices, faces and material batches
//! - [`SceneBuilder`] drives clumps, prototypes and instances
//!
//! ## Not Supported
//!
//! - Writing RWX back out
//! - Streaming or incremental parsing
//!
//! # Example
//!
//! ```ignore
//! use rwx_core::rwx::{RwxLoader, LoaderConfig};
//!
//! let loader = RwxLoader::new(LoaderConfig::default().with_wait_full_load(true));
//! let model = loader.load("path/to/model.rwx")?;
//! println!("{} materials", model.materials.len());
//! ```

mod accumulator;
mod builder;
mod command;
mod config;
pub mod grammar;
mod loader;
mod registry;
mod transform;
mod triangulate;

pub use accumulator::GeometryAccumulator;
pub use builder::{BuildOutput, SceneBuilder, ROOT_SCALE};
pub use command::Command;
pub use config::LoaderConfig;
pub use loader::*;
pub use registry::MaterialRegistry;
pub use transform::TransformStack;
pub use triangulate::{triangulate_loop, Triangulation};
