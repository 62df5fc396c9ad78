use super::{Asset, ImageAsset, JsonAsset, TextAsset};
use crate::error::AssetError;

/// Turns fetched bytes into an [`Asset`]. Chosen by file extension.
pub trait AssetLoader: Send + Sync {
    /// Lowercase extensions without the leading dot.
    fn supported_extensions(&self) -> &[&'static str];

    fn decode(&self, name: &str, bytes: Vec<u8>) -> Result<Asset, AssetError>;

    fn supports(&self, extension: &str) -> bool {
        self.supported_extensions().iter().any(|e| *e == extension)
    }
}

/// Decodes png, gif and jpeg images into RGBA8 pixels.
pub struct ImageAssetLoader;

impl AssetLoader for ImageAssetLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["png", "gif", "jpg", "jpeg"]
    }

    fn decode(&self, name: &str, bytes: Vec<u8>) -> Result<Asset, AssetError> {
        let image = image::load_from_memory(&bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Asset::Image(ImageAsset {
            name: name.to_owned(),
            width,
            height,
            pixels: image.into_raw(),
        }))
    }
}

pub struct JsonAssetLoader;

impl AssetLoader for JsonAssetLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn decode(&self, name: &str, bytes: Vec<u8>) -> Result<Asset, AssetError> {
        Ok(Asset::Json(JsonAsset {
            name: name.to_owned(),
            data: serde_json::from_slice(&bytes)?,
        }))
    }
}

/// Plain text and bitmap font descriptions.
pub struct TextAssetLoader;

impl AssetLoader for TextAssetLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["txt", "fnt"]
    }

    fn decode(&self, name: &str, bytes: Vec<u8>) -> Result<Asset, AssetError> {
        Ok(Asset::Text(TextAsset {
            name: name.to_owned(),
            data: String::from_utf8(bytes)?,
        }))
    }
}

/// Lowercased text after the last `.`, if any.
pub fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_last_suffix_lowercased() {
        assert_eq!(extension_of("textures/Wood.Final.PNG").as_deref(), Some("png"));
        assert_eq!(extension_of("README"), None);
    }

    #[test]
    fn json_loader_parses_document() {
        let asset = JsonAssetLoader.decode("level.json", br#"{"name":"x"}"#.to_vec()).unwrap();
        assert_eq!(asset.as_json().unwrap()["name"], "x");
    }

    #[test]
    fn text_loader_rejects_invalid_utf8() {
        assert!(matches!(
            TextAssetLoader.decode("a.txt", vec![0xff, 0xfe]),
            Err(AssetError::Utf8(_))
        ));
    }

    #[test]
    fn image_loader_decodes_png() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 4, image::Rgba([1, 2, 3, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let asset = ImageAssetLoader.decode("a.png", png).unwrap();
        let image = asset.as_image().unwrap();
        assert_eq!((image.width, image.height), (2, 4));
        assert_eq!(&image.pixels[..4], &[1, 2, 3, 255]);
    }
}
