//! Texture and mask resolution for RWX materials.
//!
//! Materials only name their textures; turning a name into pixels is the job
//! of a [`TextureResolver`]. Requests are asynchronous: a resolver returns a
//! future immediately and the material registry shares that future between
//! every mesh that uses the material.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;

/// Errors that can occur while resolving a texture or mask.
///
/// These never abort a parse; the affected material stays untextured.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResourceError {
    #[error("Texture file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to decode {name}: {message}")]
    Decode { name: String, message: String },

    #[error("Failed to read archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("Archive {archive} has no entry {entry}")]
    MissingEntry { archive: PathBuf, entry: String },

    #[error("No texture source available for {0}")]
    Unavailable(String),

    #[error("Loading of {0} was abandoned")]
    Canceled(String),
}

pub type ResourceResult<T> = Result<T, ResourceError>;

/// Future produced by a resolver for one texture or mask request.
pub type TextureFuture = BoxFuture<'static, ResourceResult<Arc<Texture>>>;

/// Memoized handle to a pending or settled texture request.
pub type TextureHandle = Shared<TextureFuture>;

/// A decoded texture or mask bitmap.
///
/// Pixels are kept as 8-bit RGBA, row-major, top row first.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    pub pixels: Vec<[u8; 4]>,

    /// Where the texture came from (for debugging)
    pub source: String,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 4]>, source: impl Into<String>) -> Self {
        Self {
            width,
            height,
            pixels,
            source: source.into(),
        }
    }

    /// Convert a decoded image.
    pub fn from_image(image: image::DynamicImage, source: impl Into<String>) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba.pixels().map(|p| p.0).collect();
        Self::new(width, height, pixels, source)
    }

    /// Get pixel at integer coordinates, `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[u8; 4]>()
    }
}

/// Source of texture and mask bitmaps for material resources.
///
/// Implementations must return promptly; any slow work belongs inside the
/// returned future.
pub trait TextureResolver: Send + Sync {
    /// Resolve the colour texture called `name`.
    fn resolve_texture(&self, name: &str) -> TextureFuture;

    /// Resolve the alpha mask called `name`.
    fn resolve_mask(&self, name: &str) -> TextureFuture;
}

/// Resolver that has nothing to offer; every request fails with
/// [`ResourceError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTextureResolver;

impl TextureResolver for NullTextureResolver {
    fn resolve_texture(&self, name: &str) -> TextureFuture {
        futures::future::ready(Err(ResourceError::Unavailable(name.to_string()))).boxed()
    }

    fn resolve_mask(&self, name: &str) -> TextureFuture {
        futures::future::ready(Err(ResourceError::Unavailable(name.to_string()))).boxed()
    }
}

/// Loads textures from a folder next to the model, decoding on the rayon pool.
///
/// Textures live at `folder/<name>.<texture_extension>`. Masks are either a
/// plain image at `folder/<name>.<mask_extension>` or, when the mask
/// extension is `zip`, a `<name>.bmp` entry inside `folder/<name>.zip`.
#[derive(Debug, Clone)]
pub struct FsTextureResolver {
    folder: PathBuf,
    texture_extension: String,
    mask_extension: String,
}

impl FsTextureResolver {
    pub fn new(
        folder: impl Into<PathBuf>,
        texture_extension: impl Into<String>,
        mask_extension: impl Into<String>,
    ) -> Self {
        Self {
            folder: folder.into(),
            texture_extension: texture_extension.into(),
            mask_extension: mask_extension.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn path_for(&self, name: &str, extension: &str) -> PathBuf {
        self.folder.join(format!("{}.{}", name, extension))
    }
}

impl TextureResolver for FsTextureResolver {
    fn resolve_texture(&self, name: &str) -> TextureFuture {
        let path = self.path_for(name, &self.texture_extension);
        spawn_load(name.to_string(), move || load_image_file(&path))
    }

    fn resolve_mask(&self, name: &str) -> TextureFuture {
        if self.mask_extension.eq_ignore_ascii_case("zip") {
            let archive = self.path_for(name, "zip");
            let entry = name.to_string();
            spawn_load(name.to_string(), move || load_archived_bitmap(&archive, &entry))
        } else {
            let path = self.path_for(name, &self.mask_extension);
            spawn_load(name.to_string(), move || load_image_file(&path))
        }
    }
}

/// Run `load` on the rayon pool and hand back a future for its result.
fn spawn_load<F>(name: String, load: F) -> TextureFuture
where
    F: FnOnce() -> ResourceResult<Texture> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    rayon::spawn(move || {
        let result = load().map(Arc::new);
        if let Err(e) = &result {
            log::debug!("Texture request failed: {}", e);
        }
        // The receiver may already be gone if nobody kept the handle.
        let _ = tx.send(result);
    });

    async move {
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ResourceError::Canceled(name)),
        }
    }
    .boxed()
}

/// Load an image file from disk.
fn load_image_file(path: &Path) -> ResourceResult<Texture> {
    if !path.exists() {
        return Err(ResourceError::NotFound(path.to_path_buf()));
    }

    let img = image::open(path).map_err(|e| ResourceError::Decode {
        name: path.display().to_string(),
        message: e.to_string(),
    })?;

    let texture = Texture::from_image(img, path.display().to_string());
    log::debug!(
        "Loaded texture: {} ({}x{}, {:.1} KB)",
        path.display(),
        texture.width,
        texture.height,
        texture.size_bytes() as f32 / 1024.0
    );

    Ok(texture)
}

/// Extract `<entry>.bmp` (or `.BMP`) from a zip archive and decode it.
fn load_archived_bitmap(archive_path: &Path, entry: &str) -> ResourceResult<Texture> {
    if !archive_path.exists() {
        return Err(ResourceError::NotFound(archive_path.to_path_buf()));
    }

    let archive_error = |message: String| ResourceError::Archive {
        path: archive_path.to_path_buf(),
        message,
    };

    let file = File::open(archive_path).map_err(|e| archive_error(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

    let candidates = [format!("{}.bmp", entry), format!("{}.BMP", entry)];
    let entry_name = candidates
        .iter()
        .find(|candidate| archive.file_names().any(|name| name == candidate.as_str()))
        .cloned()
        .ok_or_else(|| ResourceError::MissingEntry {
            archive: archive_path.to_path_buf(),
            entry: candidates[0].clone(),
        })?;

    let mut bytes = Vec::new();
    archive
        .by_name(&entry_name)
        .map_err(|e| archive_error(e.to_string()))?
        .read_to_end(&mut bytes)
        .map_err(|e| archive_error(e.to_string()))?;

    let img = image::load_from_memory(&bytes).map_err(|e| ResourceError::Decode {
        name: entry_name.clone(),
        message: e.to_string(),
    })?;

    Ok(Texture::from_image(
        img,
        format!("{}#{}", archive_path.display(), entry_name),
    ))
}
