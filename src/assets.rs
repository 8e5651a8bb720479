use crate::error::AssetError;
use base64::Engine;
use image::GenericImageView;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;

/// Pixel data ready to be written as a PDF image XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
    pub bits_per_component: u8,
    pub filter: &'static str,
    pub data: Vec<u8>,
    pub alpha: Option<AlphaData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlphaData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl DecodedImage {
    /// Height over width, used to keep the aspect ratio when scaling.
    pub fn aspect(&self) -> f32 {
        if self.width == 0 {
            return 1.0;
        }
        self.height as f32 / self.width as f32
    }
}

/// Loads an image from a `data:` URI or, failing that, a filesystem path.
pub fn decode_image(source: &str) -> Result<DecodedImage, AssetError> {
    let source = source.trim();
    if source.is_empty() {
        return Err(AssetError::Empty);
    }
    if source.starts_with("data:") {
        let (mime, data) = parse_data_uri(source)?;
        return decode_image_bytes(&data, Some(&mime));
    }
    let bytes = std::fs::read(Path::new(source))
        .map_err(|err| AssetError::Unsupported(format!("{source}: {err}")))?;
    decode_image_bytes(&bytes, None)
}

/// Stable XObject resource id for an image source.
pub fn image_resource_id(source: &str) -> String {
    let digest = Sha256::digest(source.trim().as_bytes());
    let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("img-{hex}")
}

pub fn decode_image_bytes(data: &[u8], mime: Option<&str>) -> Result<DecodedImage, AssetError> {
    if data.is_empty() {
        return Err(AssetError::Empty);
    }
    let format = match mime {
        Some(mime) if mime.contains("png") => Some(image::ImageFormat::Png),
        Some(mime) if mime.contains("jpeg") || mime.contains("jpg") => {
            Some(image::ImageFormat::Jpeg)
        }
        Some(mime) if mime.starts_with("image/") => {
            return Err(AssetError::Unsupported(mime.to_string()));
        }
        _ => image::guess_format(data).ok(),
    };

    let decoded = match format {
        Some(format) => image::load_from_memory_with_format(data, format)?,
        None => image::load_from_memory(data)?,
    };
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(AssetError::Unsupported("zero-sized image".to_string()));
    }

    if matches!(format, Some(image::ImageFormat::Jpeg)) {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Ok(DecodedImage {
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: "/DCTDecode",
            data: data.to_vec(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let alpha = if has_alpha {
        Some(AlphaData {
            width,
            height,
            data: flate_compress(&alpha)?,
        })
    } else {
        None
    };
    Ok(DecodedImage {
        width,
        height,
        color_space: "/DeviceRGB",
        bits_per_component: 8,
        filter: "/FlateDecode",
        data: flate_compress(&rgb)?,
        alpha,
    })
}

pub fn parse_data_uri(uri: &str) -> Result<(String, Vec<u8>), AssetError> {
    let Some(rest) = uri.strip_prefix("data:") else {
        return Err(AssetError::InvalidDataUri("missing data: scheme".to_string()));
    };
    let Some((header, payload)) = rest.split_once(',') else {
        return Err(AssetError::InvalidDataUri("missing ',' separator".to_string()));
    };
    let mime = header
        .split(';')
        .next()
        .filter(|mime| !mime.is_empty())
        .unwrap_or("application/octet-stream")
        .to_ascii_lowercase();
    let data = if header.split(';').any(|part| part == "base64") {
        let compact: String = payload.chars().filter(|ch| !ch.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD.decode(compact)?
    } else {
        payload.as_bytes().to_vec()
    };
    if data.is_empty() {
        return Err(AssetError::Empty);
    }
    Ok((mime, data))
}

pub(crate) fn flate_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A tiny PNG encoded in memory, `alpha` selects a translucent pixel.
    pub(crate) fn png_bytes(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, alpha]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    pub(crate) fn png_data_uri(width: u32, height: u32) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(width, height, 255));
        format!("data:image/png;base64,{encoded}")
    }

    #[test]
    fn decodes_png_data_uri() {
        let image = decode_image(&png_data_uri(4, 2)).expect("decode");
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(image.filter, "/FlateDecode");
        assert!(image.alpha.is_none());
        assert!((image.aspect() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn compressed_streams_inflate_to_their_input() {
        use std::io::Read;

        let raw: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let packed = flate_compress(&raw).expect("compress");
        assert!(!packed.is_empty());
        let mut inflated = Vec::new();
        flate2::read::ZlibDecoder::new(packed.as_slice())
            .read_to_end(&mut inflated)
            .expect("inflate");
        assert_eq!(inflated, raw);
    }

    #[test]
    fn translucent_png_carries_soft_mask() {
        let image = decode_image_bytes(&png_bytes(2, 2, 128), None).expect("decode");
        assert!(image.alpha.is_some());
    }

    #[test]
    fn malformed_sources_are_reported() {
        assert!(matches!(decode_image("  "), Err(AssetError::Empty)));
        assert!(matches!(
            decode_image("data:image/png;base64"),
            Err(AssetError::InvalidDataUri(_))
        ));
        assert!(matches!(
            decode_image("data:image/png;base64,@@@"),
            Err(AssetError::Base64(_))
        ));
        assert!(matches!(
            decode_image("data:image/png;base64,AAAA"),
            Err(AssetError::Decode(_))
        ));
        assert!(matches!(
            decode_image("data:image/gif;base64,R0lGODlh"),
            Err(AssetError::Unsupported(_))
        ));
    }

    #[test]
    fn resource_ids_are_stable() {
        let uri = png_data_uri(1, 1);
        assert_eq!(image_resource_id(&uri), image_resource_id(&format!(" {uri} ")));
        assert!(image_resource_id(&uri).starts_with("img-"));
    }
}
