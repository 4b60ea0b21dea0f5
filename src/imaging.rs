//! 账单照片预处理: 限制最长边、转码、base64 编码

use crate::config::ImageConfig;
use crate::error::{Result, SplitError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeFormat {
    Png,
    Jpeg,
}

impl EncodeFormat {
    pub fn mime(self) -> &'static str {
        match self {
            EncodeFormat::Png => "image/png",
            EncodeFormat::Jpeg => "image/jpeg",
        }
    }
}

/// 可直接放入请求体的图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: EncodeFormat,
    pub base64: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime(), self.base64)
    }
}

/// 读取图片并按配置编码，不修改源文件
pub fn encode(image_path: &Path, config: &ImageConfig) -> Result<EncodedImage> {
    let img = ImageReader::open(image_path)
        .map_err(|e| SplitError::io(image_path, e))?
        .with_guessed_format()
        .map_err(|e| SplitError::io(image_path, e))?
        .decode()
        .map_err(|e| SplitError::io(image_path, e))?;

    let (width, height) = (img.width(), img.height());
    let img = match config.max_size {
        Some(max_size) => downscale(img, max_size),
        None => img,
    };
    if img.width() != width || img.height() != height {
        tracing::debug!(
            "Resized {} from {}x{} to {}x{}",
            image_path.display(),
            width,
            height,
            img.width(),
            img.height()
        );
    }

    let mut buffer: Vec<u8> = Vec::new();
    let written = match config.format {
        // PNG 无损，忽略 quality
        EncodeFormat::Png => img.write_with_encoder(PngEncoder::new(&mut buffer)),
        EncodeFormat::Jpeg => {
            // JPEG 不支持 alpha 通道
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(
                &mut buffer,
                jpeg_quality(config.quality),
            ))
        }
    };
    written.map_err(|e| SplitError::io(image_path, e))?;

    Ok(EncodedImage {
        format: config.format,
        base64: BASE64.encode(&buffer),
    })
}

/// 最长边超过上限时等比缩小 (Catmull-Rom 双三次)
fn downscale(img: DynamicImage, max_size: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let longest = width.max(height);
    if max_size == 0 || longest <= max_size {
        return img;
    }

    let ratio = f64::from(max_size) / f64::from(longest);
    let new_width = ((f64::from(width) * ratio) as u32).max(1);
    let new_height = ((f64::from(height) * ratio) as u32).max(1);
    img.resize_exact(new_width, new_height, FilterType::CatmullRom)
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]))
            .save(&path)
            .unwrap();
        path
    }

    fn decode_back(encoded: &EncodedImage) -> DynamicImage {
        let bytes = BASE64.decode(&encoded.base64).unwrap();
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn no_max_size_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "bill.png", 37, 91);
        let config = ImageConfig {
            max_size: None,
            ..ImageConfig::default()
        };

        let encoded = encode(&path, &config).unwrap();
        let img = decode_back(&encoded);
        assert_eq!((img.width(), img.height()), (37, 91));
    }

    #[test]
    fn longest_edge_is_bounded_with_aspect_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "bill.png", 400, 200);
        let config = ImageConfig {
            max_size: Some(100),
            ..ImageConfig::default()
        };

        let img = decode_back(&encode(&path, &config).unwrap());
        assert_eq!((img.width(), img.height()), (100, 50));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "bill.png", 60, 30);
        let config = ImageConfig {
            max_size: Some(1020),
            ..ImageConfig::default()
        };

        let img = decode_back(&encode(&path, &config).unwrap());
        assert_eq!((img.width(), img.height()), (60, 30));
    }

    #[test]
    fn jpeg_output_uses_jpeg_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "bill.png", 20, 10);
        let config = ImageConfig {
            max_size: None,
            format: EncodeFormat::Jpeg,
            quality: 0.8,
        };

        let encoded = encode(&path, &config).unwrap();
        assert!(encoded.data_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!(decode_back(&encoded).width(), 20);
    }

    #[test]
    fn source_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "bill.png", 300, 300);
        let before = std::fs::read(&path).unwrap();

        encode(&path, &ImageConfig { max_size: Some(10), ..ImageConfig::default() }).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn unreadable_or_garbage_files_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        assert!(matches!(
            encode(&missing, &ImageConfig::default()),
            Err(SplitError::Io { .. })
        ));

        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"definitely not an image").unwrap();
        assert!(matches!(
            encode(&garbage, &ImageConfig::default()),
            Err(SplitError::Io { .. })
        ));
    }

    #[test]
    fn quality_maps_to_jpeg_scale() {
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(0.75), 75);
        assert_eq!(jpeg_quality(4.0), 100);
    }
}
