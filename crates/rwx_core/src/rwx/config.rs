//! Loader configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::loader::{LoadError, LoadResult};

/// Options controlling how RWX models are loaded.
///
/// Every field has a default, so a JSON document only needs the keys it
/// wants to change:
///
/// ```ignore
/// let config = LoaderConfig::from_json(r#"{ "texture_extension": "png", "flatten": true }"#)?;
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Folder holding textures and masks; defaults to the model's folder
    pub texture_folder: Option<PathBuf>,

    /// Extension of texture files, without the dot
    pub texture_extension: String,

    /// Extension of mask files; `zip` reads a bitmap from an archive
    pub mask_extension: String,

    /// Wait for every texture and mask before returning the model
    pub wait_full_load: bool,

    /// Return a single merged mesh instead of the node hierarchy
    pub flatten: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            texture_folder: None,
            texture_extension: "jpg".to_string(),
            mask_extension: "zip".to_string(),
            wait_full_load: false,
            flatten: false,
        }
    }
}

impl LoaderConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> LoadResult<Self> {
        serde_json::from_str(json).map_err(LoadError::Config)
    }

    pub fn with_texture_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.texture_folder = Some(folder.into());
        self
    }

    pub fn with_texture_extension(mut self, extension: impl Into<String>) -> Self {
        self.texture_extension = extension.into();
        self
    }

    pub fn with_mask_extension(mut self, extension: impl Into<String>) -> Self {
        self.mask_extension = extension.into();
        self
    }

    pub fn with_wait_full_load(mut self, wait: bool) -> Self {
        self.wait_full_load = wait;
        self
    }

    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }
}
