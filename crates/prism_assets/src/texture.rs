use std::path::{Path, PathBuf};

use image::ImageFormat;
use log::{debug, warn};

use crate::{
    ImportError, Result,
    imported::{ImportedTexture, TextureContent},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8Unorm,     // Linear data (normal maps)
    Rgba8UnormSrgb, // Color data (base color, emissive)
}

#[derive(Clone, Debug)]
pub struct TextureData {
    pub name: String,
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub mipmap: bool,
    pub interpolate: bool,
}

impl TextureData {
    pub fn from_rgba(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            pixels,
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            mipmap: true,
            interpolate: true,
        }
    }

    pub fn with_srgb(mut self, srgb: bool) -> Self {
        self.format = if srgb {
            TextureFormat::Rgba8UnormSrgb
        } else {
            TextureFormat::Rgba8Unorm
        };
        self
    }

    pub fn is_srgb(&self) -> bool {
        self.format == TextureFormat::Rgba8UnormSrgb
    }
}

/// Decodes one embedded texture record into RGBA8 pixels.
pub fn decode_embedded(name: &str, texture: &ImportedTexture) -> Result<TextureData> {
    match &texture.content {
        TextureContent::Compressed { data, format_hint } => {
            let img = match format_hint.to_ascii_lowercase().as_str() {
                "png" => image::load_from_memory_with_format(data, ImageFormat::Png)?,
                "jpg" | "jpeg" => image::load_from_memory_with_format(data, ImageFormat::Jpeg)?,
                other => {
                    warn!("Embedded texture '{name}' has unsupported format hint '{other}', guessing");
                    image::load_from_memory(data).map_err(|_| {
                        ImportError::UnsupportedFeature(format!("texture format '{other}'"))
                    })?
                }
            };
            let img = img.to_rgba8();
            let (width, height) = img.dimensions();
            Ok(TextureData::from_rgba(name, width, height, img.into_raw()))
        }
        TextureContent::Raw {
            width,
            height,
            texels,
        } => {
            let len = 4 * (*width as usize) * (*height as usize);
            if texels.len() < len {
                return Err(ImportError::InvalidInput(format!(
                    "embedded texture '{name}' holds {} bytes, {width}x{height} needs {len}",
                    texels.len()
                )));
            }
            // From the embedded buffer into the image, four bytes per texel
            let pixels = texels[..len].to_vec();
            Ok(TextureData::from_rgba(name, *width, *height, pixels))
        }
    }
}

/// Resolves material texture references.
///
/// A reference is either `*N` (embedded texture N), the file name of an
/// embedded texture, or a path relative to the asset's directory.
pub struct TextureResolver {
    base_dir: PathBuf,
    embedded: Vec<Option<TextureData>>,
    embedded_names: Vec<Option<String>>,
}

impl TextureResolver {
    pub fn new(asset_path: &Path, textures: &[ImportedTexture]) -> Self {
        let base_dir = asset_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("./"));

        let embedded = textures
            .iter()
            .enumerate()
            .map(|(i, tex)| {
                let name = tex.filename.clone().unwrap_or_else(|| format!("*{i}"));
                match decode_embedded(&name, tex) {
                    Ok(data) => Some(data),
                    Err(e) => {
                        warn!("Cannot decode embedded texture {name}: {e}");
                        None
                    }
                }
            })
            .collect();

        Self {
            base_dir,
            embedded,
            embedded_names: textures.iter().map(|t| t.filename.clone()).collect(),
        }
    }

    pub fn embedded(&self) -> impl Iterator<Item = Option<&TextureData>> {
        self.embedded.iter().map(Option::as_ref)
    }

    pub fn try_resolve(&self, reference: &str, srgb: bool) -> Result<TextureData> {
        let texture = if let Some(index) = reference.strip_prefix('*') {
            let index: usize = index.parse().map_err(|_| {
                ImportError::InvalidInput(format!("bad embedded texture reference '{reference}'"))
            })?;
            self.embedded
                .get(index)
                .and_then(Option::clone)
                .ok_or_else(|| ImportError::MissingResource(PathBuf::from(reference)))?
        } else if let Some(data) = self.embedded_by_name(reference) {
            data.clone()
        } else {
            self.load_external(reference)?
        };

        Ok(texture.with_srgb(srgb))
    }

    /// Like [`try_resolve`](Self::try_resolve) but logs and swallows failures.
    pub fn resolve(&self, reference: &str, srgb: bool) -> Option<TextureData> {
        match self.try_resolve(reference, srgb) {
            Ok(tex) => Some(tex),
            Err(ImportError::MissingResource(path)) => {
                warn!("Cannot find texture: {}", path.display());
                None
            }
            Err(e) => {
                warn!("Cannot load texture '{reference}': {e}");
                None
            }
        }
    }

    // Embedded textures are sometimes referenced by their original file name
    fn embedded_by_name(&self, reference: &str) -> Option<&TextureData> {
        let wanted = file_name(reference);
        self.embedded_names
            .iter()
            .position(|name| {
                name.as_deref()
                    .is_some_and(|n| n == reference || file_name(n) == wanted)
            })
            .and_then(|i| self.embedded[i].as_ref())
    }

    fn load_external(&self, reference: &str) -> Result<TextureData> {
        let path = self.base_dir.join(reference);
        if !path.is_file() {
            return Err(ImportError::MissingResource(path));
        }

        debug!("Loading texture {}", path.display());
        let img = image::open(&path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(TextureData::from_rgba(reference, width, height, img.into_raw()))
    }
}

fn file_name(reference: &str) -> &str {
    reference
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32) -> ImportedTexture {
        ImportedTexture {
            filename: Some("textures/checker.raw".into()),
            content: TextureContent::Raw {
                width,
                height,
                texels: (0..(width * height * 4)).map(|v| v as u8).collect(),
            },
        }
    }

    #[test]
    fn raw_texels_are_copied_into_the_image() {
        let tex = decode_embedded("checker", &raw(2, 3)).unwrap();
        assert_eq!((tex.width, tex.height), (2, 3));
        assert_eq!(tex.pixels.len(), 24);
        assert_eq!(tex.pixels[..4], [0, 1, 2, 3]);
        assert_eq!(tex.pixels[23], 23);
    }

    #[test]
    fn short_raw_buffer_is_rejected() {
        let mut tex = raw(2, 2);
        if let TextureContent::Raw { texels, .. } = &mut tex.content {
            texels.truncate(3);
        }
        assert!(matches!(
            decode_embedded("short", &tex),
            Err(ImportError::InvalidInput(_))
        ));
    }

    #[test]
    fn unknown_format_that_cannot_be_guessed_is_unsupported() {
        let tex = ImportedTexture {
            filename: None,
            content: TextureContent::Compressed {
                data: vec![1, 2, 3, 4],
                format_hint: "ktx2".into(),
            },
        };
        assert!(matches!(
            decode_embedded("*0", &tex),
            Err(ImportError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn star_reference_and_filename_hit_the_embedded_table() {
        let resolver = TextureResolver::new(Path::new("/nowhere/model.gltf"), &[raw(1, 1)]);
        let by_index = resolver.try_resolve("*0", true).unwrap();
        assert!(by_index.is_srgb());
        assert!(by_index.mipmap && by_index.interpolate);

        let by_name = resolver.try_resolve("checker.raw", false).unwrap();
        assert_eq!(by_name.pixels, by_index.pixels);
        assert!(!by_name.is_srgb());
    }

    #[test]
    fn missing_external_texture_is_reported() {
        let resolver = TextureResolver::new(Path::new("/nowhere/model.gltf"), &[]);
        match resolver.try_resolve("tex/missing.png", false) {
            Err(ImportError::MissingResource(path)) => {
                assert!(path.ends_with("tex/missing.png"));
            }
            other => panic!("expected MissingResource, got {other:?}"),
        }
        assert!(resolver.resolve("tex/missing.png", false).is_none());
        assert!(resolver.try_resolve("*7", false).is_err());
    }
}
