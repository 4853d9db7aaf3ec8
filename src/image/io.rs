//! Convenience helpers for converting to and from the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Channels are stored as
//! `f32` in `[0, 1]`.

use crate::geometry::Dimensions;
use crate::image::Image;
use crate::util::{StyleError, StyleResult};
use std::path::Path;

/// Converts an RGB8 buffer into a 3-channel image.
pub fn image_from_rgb(img: &image::RgbImage) -> StyleResult<Image> {
    let dims = Dimensions::new(img.height() as usize, img.width() as usize);
    let data = img.as_raw().iter().map(|v| f32::from(*v) / 255.0).collect();
    Image::from_vec(data, dims, 3)
}

/// Converts a grayscale buffer into a 1-channel image.
pub fn image_from_gray(img: &image::GrayImage) -> StyleResult<Image> {
    let dims = Dimensions::new(img.height() as usize, img.width() as usize);
    let data = img.as_raw().iter().map(|v| f32::from(*v) / 255.0).collect();
    Image::from_vec(data, dims, 1)
}

/// Converts a 1- or 3-channel image into RGB8, clamping values into `[0, 1]`.
pub fn image_to_rgb(img: &Image) -> StyleResult<image::RgbImage> {
    let channels = img.channels();
    if channels != 1 && channels != 3 {
        return Err(StyleError::ChannelMismatch {
            context: "rgb export",
            expected: 3,
            got: channels,
        });
    }
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut raw = Vec::with_capacity(img.dims().len() * 3);
    for px in img.as_slice().chunks(channels) {
        match px {
            [v] => raw.extend([to_u8(*v); 3]),
            _ => raw.extend(px.iter().map(|v| to_u8(*v))),
        }
    }
    let dims = img.dims();
    image::RgbImage::from_raw(dims.cols as u32, dims.rows as u32, raw).ok_or(
        StyleError::BufferLengthMismatch {
            expected: dims.len() * 3,
            got: 0,
        },
    )
}

/// Loads an image from disk as 3-channel RGB.
pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> StyleResult<Image> {
    let img = image::open(path).map_err(|err| StyleError::ImageIo {
        reason: err.to_string(),
    })?;
    image_from_rgb(&img.to_rgb8())
}

/// Loads an image from disk as 1-channel luminance.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> StyleResult<Image> {
    let img = image::open(path).map_err(|err| StyleError::ImageIo {
        reason: err.to_string(),
    })?;
    image_from_gray(&img.to_luma8())
}

/// Saves a 1- or 3-channel image as RGB8; the format follows the extension.
pub fn save_rgb_image<P: AsRef<Path>>(img: &Image, path: P) -> StyleResult<()> {
    image_to_rgb(img)?
        .save(path)
        .map_err(|err| StyleError::ImageIo {
            reason: err.to_string(),
        })
}
