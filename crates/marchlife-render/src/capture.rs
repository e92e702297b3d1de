//! Saving rendered frames as images.

use std::path::Path;

use image::{ImageBuffer, Rgba};

use crate::error::{RenderError, RenderResult};
use crate::renderer::RenderedFrame;

fn to_image(frame: &RenderedFrame) -> RenderResult<ImageBuffer<Rgba<u8>, Vec<u8>>> {
    // wgpu uses a top-left origin, so no vertical flip is needed
    ImageBuffer::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or(RenderError::InvalidImageData)
}

/// Saves a frame to an image file.
///
/// The format follows the extension: `.png`, or `.jpg`/`.jpeg` (alpha dropped).
pub fn save_image(path: impl AsRef<Path>, frame: &RenderedFrame) -> RenderResult<()> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_image(frame)?;
    match extension.as_str() {
        "png" => img.save_with_format(path, image::ImageFormat::Png)?,
        "jpg" | "jpeg" => {
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => return Err(RenderError::UnsupportedFormat(extension)),
    }
    log::debug!(
        "[capture] saved generation {} to {}",
        frame.generation,
        path.display()
    );
    Ok(())
}

/// Encodes a frame as PNG in memory.
pub fn encode_png(frame: &RenderedFrame) -> RenderResult<Vec<u8>> {
    let img = to_image(frame)?;
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> RenderedFrame {
        RenderedFrame {
            generation: 3,
            width,
            height,
            pixels: (0..width * height * 4).map(|i| (i % 251) as u8).collect(),
        }
    }

    #[test]
    fn test_encode_png_round_trips_pixels() {
        let frame = frame(5, 3);
        let png = encode_png(&frame).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (5, 3));
        assert_eq!(decoded.into_raw(), frame.pixels);
    }

    #[test]
    fn test_rejects_truncated_pixels() {
        let mut frame = frame(4, 4);
        frame.pixels.truncate(10);
        assert!(matches!(
            encode_png(&frame),
            Err(RenderError::InvalidImageData)
        ));
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let err = save_image("frame.tga2", &frame(2, 2)).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedFormat(ext) if ext == "tga2"));
    }
}
