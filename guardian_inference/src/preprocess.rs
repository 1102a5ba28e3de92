use image::{imageops::FilterType, DynamicImage, ImageFormat, ImageReader};
use ndarray::Array4;
use std::io::Cursor;
use thiserror::Error;

/// Side length the classifier was trained on.
pub const IMG_SIZE: u32 = 128;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Unsupported image format: {0}. Upload a JPG or PNG file")]
    UnsupportedFormat(String),
    #[error("Error decoding image: {0}")]
    Decode(String),
    #[error("Invalid image format: {0}")]
    InvalidImageFormat(String),
}

/// Decodes an uploaded JPG/PNG file and converts it to 8-bit RGB.
pub fn decode_upload(image_data: &[u8]) -> Result<DynamicImage, PreprocessError> {
    let image_reader = ImageReader::new(Cursor::new(image_data))
        .with_guessed_format()
        .map_err(|e| PreprocessError::Decode(e.to_string()))?;

    match image_reader.format() {
        Some(ImageFormat::Png) | Some(ImageFormat::Jpeg) => {}
        Some(other) => return Err(PreprocessError::UnsupportedFormat(format!("{:?}", other))),
        None => return Err(PreprocessError::UnsupportedFormat("unknown".to_string())),
    }

    let original_img = image_reader
        .decode()
        .map_err(|e| PreprocessError::Decode(e.to_string()))?;

    Ok(DynamicImage::ImageRgb8(original_img.to_rgb8()))
}

/// Turns an RGB raster into the `[1, 128, 128, 3]` tensor the model expects.
///
/// The raster is stretched to 128x128 and pixel values are kept in their
/// stored `0..=255` range.
pub fn prepare(image: &DynamicImage) -> Result<Array4<f32>, PreprocessError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessError::InvalidImageFormat(format!(
            "empty raster ({}x{})",
            image.width(),
            image.height()
        )));
    }

    let rgb = match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => {
            return Err(PreprocessError::InvalidImageFormat(format!(
                "expected 8-bit RGB, got {:?}",
                other.color()
            )))
        }
    };

    let resized = image::imageops::resize(rgb, IMG_SIZE, IMG_SIZE, FilterType::CatmullRom);

    let size = IMG_SIZE as usize;
    let mut input = Array4::<f32>::zeros((1, size, size, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b] = pixel.0;
        input[[0, y, x, 0]] = r as f32;
        input[[0, y, x, 1]] = g as f32;
        input[[0, y, x, 2]] = b as f32;
    }

    tracing::debug!(
        "Prepared {}x{} image into tensor {:?}",
        image.width(),
        image.height(),
        input.shape()
    );

    Ok(input)
}
