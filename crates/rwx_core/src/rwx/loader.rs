//! High-level RWX model loading.
//!
//! This module provides the entry points for turning RWX text or files into
//! a [`Scene`] (or a single flattened mesh), and for optionally waiting on
//! the texture and mask requests the model's materials issued.

use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;

use super::builder::{BuildOutput, SceneBuilder};
use super::config::LoaderConfig;
use crate::flatten::FlatModel;
use crate::material::MaterialResource;
use crate::scene::{RootMetadata, Scene};
use crate::texture::{FsTextureResolver, NullTextureResolver, ResourceError, TextureResolver};

/// Errors that can occur during RWX loading.
///
/// Content problems never fail a load; only an unreadable source or an
/// invalid configuration do.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid loader configuration: {0}")]
    Config(#[source] serde_json::Error),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// The loaded model, as a hierarchy or as one merged mesh.
#[derive(Clone, Debug)]
pub enum RwxObject {
    Graph(Scene),
    Flat(FlatModel),
}

impl RwxObject {
    pub fn scene(&self) -> Option<&Scene> {
        match self {
            RwxObject::Graph(scene) => Some(scene),
            RwxObject::Flat(_) => None,
        }
    }

    pub fn flat(&self) -> Option<&FlatModel> {
        match self {
            RwxObject::Flat(flat) => Some(flat),
            RwxObject::Graph(_) => None,
        }
    }

    pub fn metadata(&self) -> &RootMetadata {
        match self {
            RwxObject::Graph(scene) => scene.metadata(),
            RwxObject::Flat(flat) => &flat.metadata,
        }
    }
}

/// A parsed model together with its materials.
#[derive(Debug)]
pub struct LoadedModel {
    pub object: RwxObject,

    /// Every distinct material of the model
    pub materials: Vec<Arc<MaterialResource>>,

    /// Texture and mask failures, filled only when loading waited for them
    pub diagnostics: Vec<ResourceError>,
}

impl LoadedModel {
    /// True once every texture and mask request has settled.
    pub fn is_settled(&self) -> bool {
        self.materials.iter().all(|m| m.is_settled())
    }
}

/// RWX loader with its configuration and texture source.
#[derive(Clone, Default)]
pub struct RwxLoader {
    config: LoaderConfig,
    resolver: Option<Arc<dyn TextureResolver>>,
}

impl RwxLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            resolver: None,
        }
    }

    /// Use `resolver` for textures and masks instead of the filesystem.
    pub fn with_resolver(mut self, resolver: Arc<dyn TextureResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    fn resolver_for(&self, model_dir: Option<&Path>) -> Arc<dyn TextureResolver> {
        if let Some(resolver) = &self.resolver {
            return Arc::clone(resolver);
        }

        let folder = self.config.texture_folder.as_deref().or(model_dir);
        match folder {
            Some(folder) => Arc::new(FsTextureResolver::new(
                folder,
                self.config.texture_extension.as_str(),
                self.config.mask_extension.as_str(),
            )),
            None => Arc::new(NullTextureResolver),
        }
    }

    fn build(&self, text: &str, name: &str, model_dir: Option<&Path>) -> BuildOutput {
        let mut builder = SceneBuilder::new(name, self.resolver_for(model_dir));
        builder.apply_text(text);
        builder.finish()
    }

    fn package(&self, output: BuildOutput, diagnostics: Vec<ResourceError>) -> LoadedModel {
        let object = if self.config.flatten {
            RwxObject::Flat(output.scene.flatten())
        } else {
            RwxObject::Graph(output.scene)
        };

        LoadedModel {
            object,
            materials: output.materials,
            diagnostics,
        }
    }

    /// Parse RWX text and return immediately.
    ///
    /// Textures keep loading in the background; materials render untextured
    /// until their requests settle.
    pub fn parse(&self, text: &str) -> LoadedModel {
        let output = self.build(text, "rwx", None);
        self.package(output, Vec::new())
    }

    /// Parse RWX text and wait for every texture and mask request.
    pub async fn parse_complete(&self, text: &str) -> LoadedModel {
        let output = self.build(text, "rwx", None);
        let diagnostics = wait_for_resources(&output.materials).await;
        self.package(output, diagnostics)
    }

    /// Load an RWX file.
    ///
    /// Textures are looked up next to the file unless a texture folder is
    /// configured. Blocks on texture loading when `wait_full_load` is set.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> LoadResult<LoadedModel> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed");

        log::info!("Loading RWX file: {}", path.display());
        let output = self.build(&text, name, path.parent());

        let diagnostics = if self.config.wait_full_load {
            pollster::block_on(wait_for_resources(&output.materials))
        } else {
            Vec::new()
        };

        Ok(self.package(output, diagnostics))
    }
}

/// Wait until every request of `materials` settles and collect the failures.
///
/// One failed request never stops the others.
pub async fn wait_for_resources(materials: &[Arc<MaterialResource>]) -> Vec<ResourceError> {
    let handles: Vec<_> = materials
        .iter()
        .flat_map(|m| m.handles().cloned())
        .collect();

    let results = join_all(handles).await;
    let diagnostics: Vec<ResourceError> = results.into_iter().filter_map(Result::err).collect();

    for error in &diagnostics {
        log::warn!("{}", error);
    }
    diagnostics
}

/// Load an RWX file with the default configuration.
///
/// # Example
///
/// ```ignore
/// use rwx_core::rwx::load_rwx;
///
/// let model = load_rwx("models/tree.rwx")?;
/// if let Some(scene) = model.object.scene() {
///     println!("{} meshes", scene.mesh_count());
/// }
/// ```
pub fn load_rwx<P: AsRef<Path>>(path: P) -> LoadResult<LoadedModel> {
    RwxLoader::default().load(path)
}

/// Parse RWX text into a scene without textures (useful for testing).
pub fn parse_rwx(text: &str) -> Scene {
    let loader = RwxLoader::default().with_resolver(Arc::new(NullTextureResolver));
    let output = loader.build(text, "rwx", None);
    output.scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use rwx_math::Vec3;

    const TEXTURED_QUAD: &str = "\
modelbegin
clumpbegin
texture brick mask brickm
vertex 0 0 0 uv 0 0
vertex 1 0 0 uv 1 0
vertex 1 1 0 uv 1 1
vertex 0 1 0 uv 0 1
quad 1 2 3 4
clumpend
modelend
";

    fn temp_folder(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rwx_loader_{}_{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_texture(dir: &Path, file: &str) {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 255]));
        img.save(dir.join(file)).unwrap();
    }

    fn write_mask_archive(dir: &Path, name: &str) {
        use std::io::Write;

        let bmp = dir.join(format!("{}_src.bmp", name));
        image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]))
            .save(&bmp)
            .unwrap();
        let bytes = std::fs::read(&bmp).unwrap();

        let file = std::fs::File::create(dir.join(format!("{}.zip", name))).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(format!("{}.bmp", name), zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(&bytes).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_parse_rwx() {
        let scene = parse_rwx(TEXTURED_QUAD);

        assert_eq!(scene.mesh_count(), 1);
        assert_eq!(scene.total_triangle_count(), 2);

        let mesh = scene.meshes()[0].2;
        // uv v is flipped on ingestion.
        assert_eq!(mesh.uvs[0].y, 1.0);
        assert_eq!(mesh.uvs[2].y, 0.0);
    }

    #[test]
    fn test_parse_flattened() {
        let loader = RwxLoader::new(LoaderConfig::default().with_flatten(true))
            .with_resolver(Arc::new(NullTextureResolver));
        let model = loader.parse(TEXTURED_QUAD);

        let flat = model.object.flat().unwrap();
        assert_eq!(flat.mesh.triangle_count(), 2);
        // The root scale is baked into the merged positions.
        assert_eq!(flat.mesh.positions[2], Vec3::new(10.0, 10.0, 0.0));
        assert_eq!(model.materials.len(), 1);
    }

    #[test]
    fn test_parse_complete_reports_failures() {
        let loader = RwxLoader::default().with_resolver(Arc::new(NullTextureResolver));
        let model = pollster::block_on(loader.parse_complete(TEXTURED_QUAD));

        // Texture and mask both fail, independently.
        assert_eq!(model.diagnostics.len(), 2);
        assert!(model.is_settled());
        assert!(model.object.scene().is_some());
        assert!(model.materials[0].texture().is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_rwx("/definitely/not/here.rwx").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_load_with_textures_from_model_folder() {
        let dir = temp_folder("full");
        write_texture(&dir, "brick.png");
        write_mask_archive(&dir, "brickm");
        std::fs::write(dir.join("wall.rwx"), TEXTURED_QUAD).unwrap();

        let config = LoaderConfig::default()
            .with_texture_extension("png")
            .with_wait_full_load(true);
        let model = RwxLoader::new(config).load(dir.join("wall.rwx")).unwrap();

        assert!(model.diagnostics.is_empty(), "{:?}", model.diagnostics);
        let material = &model.materials[0];
        assert_eq!(material.texture().unwrap().width, 2);
        assert_eq!(material.mask().unwrap().pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(model.object.scene().unwrap().name, "wall");
    }

    #[test]
    fn test_parse_loads_textures_in_background() {
        let dir = temp_folder("background");
        write_texture(&dir, "brick.png");

        let config = LoaderConfig::default()
            .with_texture_folder(&dir)
            .with_texture_extension("png");
        let model = RwxLoader::new(config).parse(
            "modelbegin\ntexture brick\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\ntriangle 1 2 3\nmodelend",
        );
        assert!(model.diagnostics.is_empty());

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while !model.is_settled() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert!(model.is_settled());
        assert_eq!(model.materials[0].texture().unwrap().width, 2);
    }

    #[test]
    fn test_load_reports_missing_texture() {
        let dir = temp_folder("missing_tex");
        std::fs::write(dir.join("wall.rwx"), TEXTURED_QUAD).unwrap();

        let config = LoaderConfig::default().with_wait_full_load(true);
        let model = RwxLoader::new(config).load(dir.join("wall.rwx")).unwrap();

        assert_eq!(model.diagnostics.len(), 2);
        assert!(model
            .diagnostics
            .iter()
            .all(|e| matches!(e, ResourceError::NotFound(_))));
        // Geometry is unaffected.
        assert_eq!(model.object.scene().unwrap().total_triangle_count(), 2);
    }

    #[test]
    fn test_axis_alignment_survives_flatten() {
        let loader = RwxLoader::new(LoaderConfig::default().with_flatten(true))
            .with_resolver(Arc::new(NullTextureResolver));
        let model = loader.parse("modelbegin\naxisalignment zorienty\nmodelend");

        assert_eq!(
            model.object.metadata().axis_alignment,
            crate::scene::AxisAlignment::ZOrientY
        );
    }
}
