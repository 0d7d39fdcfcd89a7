// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Clip metadata, frame payloads and the engine-facing [`Clip`] trait.
//!
//! A clip is a finite, ordered sequence of frames sharing one immutable
//! [`ClipInfo`]. Frames are produced on demand by the rendering engine and
//! handed to the dispatch loop as [`FrameData`], an ordered list of plane
//! buffers.

use serde::{Deserialize, Serialize};

/// Error type returned by the rendering engine when a frame cannot be produced.
pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

/// Color family of a video format.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColorFamily {
    /// Single luma plane.
    Gray,
    /// Luma plus two (possibly subsampled) chroma planes.
    Yuv,
    /// Three full-resolution planes.
    Rgb,
}

/// Planar pixel layout of a clip.
///
/// Subsampling factors are log2 values: a horizontal factor of 1 means the
/// chroma planes are half as wide as the luma plane.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoFormat {
    pub color_family: ColorFamily,
    pub bits_per_sample: u8,
    #[serde(default)]
    pub subsampling_w: u8,
    #[serde(default)]
    pub subsampling_h: u8,
}

impl VideoFormat {
    pub const GRAY8: VideoFormat = VideoFormat::gray(8);
    pub const GRAY16: VideoFormat = VideoFormat::gray(16);
    pub const YUV420P8: VideoFormat = VideoFormat::yuv(8, 1, 1);
    pub const YUV420P10: VideoFormat = VideoFormat::yuv(10, 1, 1);
    pub const YUV422P8: VideoFormat = VideoFormat::yuv(8, 1, 0);
    pub const YUV422P10: VideoFormat = VideoFormat::yuv(10, 1, 0);
    pub const YUV444P8: VideoFormat = VideoFormat::yuv(8, 0, 0);
    pub const YUV444P16: VideoFormat = VideoFormat::yuv(16, 0, 0);
    pub const YUV410P8: VideoFormat = VideoFormat::yuv(8, 2, 2);
    pub const YUV411P8: VideoFormat = VideoFormat::yuv(8, 2, 0);
    pub const YUV440P8: VideoFormat = VideoFormat::yuv(8, 0, 1);
    pub const RGB24: VideoFormat = VideoFormat::rgb(8);
    pub const RGB48: VideoFormat = VideoFormat::rgb(16);

    /// Creates a single-plane grayscale format.
    pub const fn gray(bits_per_sample: u8) -> Self {
        Self {
            color_family: ColorFamily::Gray,
            bits_per_sample,
            subsampling_w: 0,
            subsampling_h: 0,
        }
    }

    /// Creates a planar YUV format with the given log2 chroma subsampling.
    pub const fn yuv(bits_per_sample: u8, subsampling_w: u8, subsampling_h: u8) -> Self {
        Self {
            color_family: ColorFamily::Yuv,
            bits_per_sample,
            subsampling_w,
            subsampling_h,
        }
    }

    /// Creates a planar RGB format.
    pub const fn rgb(bits_per_sample: u8) -> Self {
        Self {
            color_family: ColorFamily::Rgb,
            bits_per_sample,
            subsampling_w: 0,
            subsampling_h: 0,
        }
    }

    /// Number of planes in a frame of this format.
    pub fn num_planes(&self) -> usize {
        match self.color_family {
            ColorFamily::Gray => 1,
            ColorFamily::Yuv | ColorFamily::Rgb => 3,
        }
    }

    /// Storage size of one sample: one byte up to 8 bits, two bytes above.
    pub fn bytes_per_sample(&self) -> usize {
        if self.bits_per_sample > 8 { 2 } else { 1 }
    }

    /// Width and height in samples of `plane` for a frame of `width` x `height`.
    pub fn plane_dimensions(&self, plane: usize, width: usize, height: usize) -> (usize, usize) {
        if plane == 0 || self.color_family != ColorFamily::Yuv {
            (width, height)
        } else {
            (width >> self.subsampling_w, height >> self.subsampling_h)
        }
    }
}

/// Rational number used for frame rates (e.g. 30000/1001 for 29.97 fps).
///
/// Values built with [`Rational::new`] are always reduced.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub numerator: u64,
    /// Denominator of the rate (defaults to 1 if omitted in JSON).
    #[serde(default = "default_denominator")]
    pub denominator: u64,
}

fn default_denominator() -> u64 {
    1
}

impl Rational {
    /// Creates a reduced fraction.
    pub fn new(numerator: u64, denominator: u64) -> Self {
        let divisor = gcd(numerator, denominator);
        if divisor == 0 {
            return Self {
                numerator,
                denominator,
            };
        }
        Self {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Static metadata of a clip.
///
/// Read once by the dispatch loop before the first frame is requested.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipInfo {
    pub format: VideoFormat,
    pub width: usize,
    pub height: usize,
    pub fps: Rational,
    pub num_frames: usize,
}

impl ClipInfo {
    /// Size in bytes of one frame of this clip.
    pub fn frame_size(&self) -> usize {
        (0..self.format.num_planes())
            .map(|plane| {
                let (w, h) = self.format.plane_dimensions(plane, self.width, self.height);
                w * h * self.format.bytes_per_sample()
            })
            .sum()
    }
}

/// Payload of one rendered frame.
///
/// Planes are stored row-major, one buffer per plane, and written out in
/// plane order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameData {
    planes: Vec<Vec<u8>>,
}

impl FrameData {
    /// Wraps already rendered plane buffers.
    pub fn from_planes(planes: Vec<Vec<u8>>) -> Self {
        Self { planes }
    }

    /// Builds a black frame matching `info`.
    ///
    /// Luma and RGB samples are zero, chroma samples sit at mid-range.
    /// Samples wider than 8 bits are stored little-endian.
    pub fn blank(info: &ClipInfo) -> Self {
        let format = &info.format;
        let planes = (0..format.num_planes())
            .map(|plane| {
                let (w, h) = format.plane_dimensions(plane, info.width, info.height);
                let value: u16 = if plane > 0 && format.color_family == ColorFamily::Yuv {
                    1 << (format.bits_per_sample.saturating_sub(1).min(15))
                } else {
                    0
                };
                let sample = value.to_le_bytes();
                let sample = &sample[..format.bytes_per_sample()];
                sample.repeat(w * h)
            })
            .collect();
        Self { planes }
    }

    /// Plane buffers in write order.
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.planes.iter().map(Vec::as_slice)
    }

    /// Mutable access to the plane buffers.
    pub fn planes_mut(&mut self) -> &mut [Vec<u8>] {
        &mut self.planes
    }

    /// Total payload size in bytes.
    pub fn len(&self) -> usize {
        self.planes.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A frame-producing node of the external rendering engine.
///
/// Implementations must be safe to call from several render worker threads
/// at once; frames may be requested out of order but are always delivered to
/// sinks in order.
pub trait Clip: Sync {
    /// Static metadata. Must not change while the clip is being dispatched.
    fn info(&self) -> ClipInfo;

    /// Renders frame `n`, with `n < info().num_frames`.
    fn get_frame(&self, n: usize) -> Result<FrameData, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_is_reduced() {
        assert_eq!(Rational::new(60000, 2002), Rational::new(30000, 1001));
        assert_eq!(Rational::new(50, 2).numerator, 25);
        assert_eq!(Rational::new(50, 2).denominator, 1);
        assert_eq!(Rational::new(0, 0).denominator, 0);
    }

    #[test]
    fn blank_yuv420p10_has_mid_chroma() {
        let info = ClipInfo {
            format: VideoFormat::YUV420P10,
            width: 4,
            height: 2,
            fps: Rational::new(24, 1),
            num_frames: 1,
        };
        let frame = FrameData::blank(&info);
        let chunks: Vec<&[u8]> = frame.chunks().collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], &[0u8; 16][..]);
        assert_eq!(chunks[1], &[0x00, 0x02, 0x00, 0x02][..]);
        assert_eq!(frame.len(), info.frame_size());
    }

    #[test]
    fn clip_info_from_json() {
        let json = r#"{
            "format": {"color_family": "gray", "bits_per_sample": 8},
            "width": 320,
            "height": 240,
            "fps": {"numerator": 25},
            "num_frames": 10
        }"#;
        let info: ClipInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.format, VideoFormat::GRAY8);
        assert_eq!(info.fps, Rational::new(25, 1));
        assert_eq!(info.frame_size(), 320 * 240);
    }
}
