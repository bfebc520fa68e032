//! RWX Core - Scene graph and RWX model loading.
//!
//! This crate provides:
//!
//! - **Scene graph types**: `Scene`, `SceneNode`, `Mesh`, `LineSegments`
//! - **Materials**: RWX material state, signatures and resolved resources
//! - **Textures**: asynchronous texture and mask resolution
//! - **RWX support**: line grammar, interpreter and loader
//!
//! # Example
//!
//! ```ignore
//! use rwx_core::rwx::load_rwx;
//!
//! // Load an RWX model
//! let model = load_rwx("tree.rwx")?;
//! if let Some(scene) = model.object.scene() {
//!     println!("Loaded {} meshes, {} triangles",
//!         scene.mesh_count(),
//!         scene.total_triangle_count());
//! }
//! ```

pub mod flatten;
pub mod material;
pub mod mesh;
pub mod rwx;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use flatten::FlatModel;
pub use material::{Appearance, Material, MaterialResource};
pub use mesh::{LineSegments, MaterialGroup, Mesh};
pub use rwx::{load_rwx, parse_rwx, LoadedModel, LoaderConfig, RwxLoader, RwxObject};
pub use scene::{AxisAlignment, NodeId, NodeKind, RootMetadata, Scene, SceneNode};
pub use texture::{FsTextureResolver, NullTextureResolver, ResourceError, Texture, TextureResolver};
