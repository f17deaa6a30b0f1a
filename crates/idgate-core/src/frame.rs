//! Frame type and decoding — raw capture buffers to RGB images.

use crate::types::BoundingBox;
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameDecodeError {
    #[error("frame has zero dimension: {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("frame dimensions {width}x{height} overflow the {format} buffer size")]
    TooLarge {
        format: ColorFormat,
        width: u32,
        height: u32,
    },
    #[error("{format} requires even dimensions, got {width}x{height}")]
    OddDimensions {
        format: ColorFormat,
        width: u32,
        height: u32,
    },
    #[error("invalid {format} buffer length: expected {expected}, got {actual}")]
    InvalidLength {
        format: ColorFormat,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Pixel layout of a capture buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFormat {
    /// 8-bit luma, 1 byte/pixel.
    Gray8,
    /// Packed RGB, 3 bytes/pixel.
    Rgb8,
    /// YUYV 4:2:2 packed: [Y0, U, Y1, V] per pixel pair.
    Yuyv,
    /// NV21 4:2:0: full Y plane followed by interleaved V/U at half resolution.
    Nv21,
}

impl ColorFormat {
    /// Exact buffer size for a frame of this format, `None` on overflow.
    fn buffer_len(self, width: usize, height: usize) -> Option<usize> {
        let pixels = width.checked_mul(height)?;
        match self {
            ColorFormat::Gray8 => Some(pixels),
            ColorFormat::Rgb8 => pixels.checked_mul(3),
            ColorFormat::Yuyv => pixels.checked_mul(2),
            ColorFormat::Nv21 => pixels.checked_add(pixels / 2),
        }
    }
}

impl fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorFormat::Gray8 => "gray8",
            ColorFormat::Rgb8 => "rgb8",
            ColorFormat::Yuyv => "yuyv",
            ColorFormat::Nv21 => "nv21",
        };
        f.write_str(name)
    }
}

impl FromStr for ColorFormat {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gray8" | "grey" | "gray" => Ok(ColorFormat::Gray8),
            "rgb8" | "rgb" => Ok(ColorFormat::Rgb8),
            "yuyv" => Ok(ColorFormat::Yuyv),
            "nv21" => Ok(ColorFormat::Nv21),
            _ => Err(UnknownVariant {
                kind: "color format",
                value: s.to_string(),
            }),
        }
    }
}

/// Clockwise rotation needed to bring the sensor image upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }
}

impl FromStr for Rotation {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .ok()
            .and_then(Rotation::from_degrees)
            .ok_or_else(|| UnknownVariant {
                kind: "rotation",
                value: s.to_string(),
            })
    }
}

/// Which camera produced the feed. Front-lens frames are mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraLens {
    Front,
    #[default]
    Back,
}

impl fmt::Display for CameraLens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraLens::Front => f.write_str("front"),
            CameraLens::Back => f.write_str("back"),
        }
    }
}

impl FromStr for CameraLens {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(CameraLens::Front),
            "back" => Ok(CameraLens::Back),
            _ => Err(UnknownVariant {
                kind: "camera lens",
                value: s.to_string(),
            }),
        }
    }
}

/// A raw frame from the capture feed.
#[derive(Debug, Clone)]
pub struct Frame {
    pub buffer: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color_format: ColorFormat,
    pub rotation: Rotation,
}

impl Frame {
    pub fn new(buffer: Vec<u8>, width: u32, height: u32, color_format: ColorFormat) -> Self {
        Self {
            buffer,
            width,
            height,
            color_format,
            rotation: Rotation::Deg0,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Decode a frame into an upright RGB image.
///
/// Applies the frame's rotation hint, then mirrors horizontally for the
/// front lens. Trailing bytes past the expected length are ignored.
pub fn decode(frame: &Frame, lens: CameraLens) -> Result<RgbImage, FrameDecodeError> {
    let (width, height) = (frame.width, frame.height);
    if width == 0 || height == 0 {
        return Err(FrameDecodeError::EmptyDimensions { width, height });
    }

    let format = frame.color_format;
    let subsampled = matches!(format, ColorFormat::Yuyv | ColorFormat::Nv21);
    let odd = width % 2 != 0 || (format == ColorFormat::Nv21 && height % 2 != 0);
    if subsampled && odd {
        return Err(FrameDecodeError::OddDimensions {
            format,
            width,
            height,
        });
    }

    let (w, h) = (width as usize, height as usize);
    let expected = format
        .buffer_len(w, h)
        .ok_or(FrameDecodeError::TooLarge {
            format,
            width,
            height,
        })?;
    if frame.buffer.len() < expected {
        return Err(FrameDecodeError::InvalidLength {
            format,
            expected,
            actual: frame.buffer.len(),
        });
    }
    let buf = &frame.buffer[..expected];

    let rgb = match format {
        ColorFormat::Rgb8 => buf.to_vec(),
        ColorFormat::Gray8 => buf.iter().flat_map(|&y| [y, y, y]).collect(),
        ColorFormat::Yuyv => yuyv_to_rgb(buf, w, h),
        ColorFormat::Nv21 => nv21_to_rgb(buf, w, h),
    };

    let upright = RgbImage::from_raw(width, height, rgb).ok_or(FrameDecodeError::InvalidLength {
        format,
        expected,
        actual: frame.buffer.len(),
    })?;

    let mut image = match frame.rotation {
        Rotation::Deg0 => upright,
        Rotation::Deg90 => imageops::rotate90(&upright),
        Rotation::Deg180 => imageops::rotate180(&upright),
        Rotation::Deg270 => imageops::rotate270(&upright),
    };

    if lens == CameraLens::Front {
        imageops::flip_horizontal_in_place(&mut image);
    }

    Ok(image)
}

/// Crop the face region out of a decoded image.
///
/// The box is clamped to the image; returns `None` when nothing remains.
pub fn crop_face(image: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let (img_w, img_h) = image.dimensions();

    let x0 = bbox.x.max(0.0).floor() as u32;
    let y0 = bbox.y.max(0.0).floor() as u32;
    let x1 = ((bbox.x + bbox.width).ceil().max(0.0) as u32).min(img_w);
    let y1 = ((bbox.y + bbox.height).ceil().max(0.0) as u32).min(img_h);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// BT.601 YCbCr → RGB.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = y + 1.402 * v;
    let g = y - 0.344_136 * u - 0.714_136 * v;
    let b = y + 1.772 * u;

    [
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ]
}

fn yuyv_to_rgb(buf: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height * 3);
    for pair in buf.chunks_exact(4) {
        let (y0, u, y1, v) = (pair[0], pair[1], pair[2], pair[3]);
        out.extend_from_slice(&yuv_to_rgb(y0, u, v));
        out.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    out
}

fn nv21_to_rgb(buf: &[u8], width: usize, height: usize) -> Vec<u8> {
    let (luma, chroma) = buf.split_at(width * height);
    let mut out = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        for col in 0..width {
            let y = luma[row * width + col];
            let c = (row / 2) * width + (col / 2) * 2;
            let (v, u) = (chroma[c], chroma[c + 1]);
            out.extend_from_slice(&yuv_to_rgb(y, u, v));
        }
    }
    out
}
