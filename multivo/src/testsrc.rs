// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Synthetic clips for tests and demos.

use crate::clip::{Clip, ClipInfo, FrameData, Rational, RenderError, VideoFormat};

/// Clip of black frames, optionally stamped with their frame number.
///
/// When stamping is enabled the first four bytes of the first plane hold
/// the frame number as a little-endian `u32`, so the order in which frames
/// reach a sink can be checked by reading the payload back.
///
/// # Examples
///
/// ```
/// use multivo::{BlankClip, Clip, VideoFormat};
///
/// let clip = BlankClip::new(VideoFormat::YUV420P8, 64, 48, 10).with_frame_numbers();
/// let frame = clip.get_frame(7).unwrap();
/// let first = frame.chunks().next().unwrap();
/// assert_eq!(&first[..4], &7u32.to_le_bytes());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankClip {
    info: ClipInfo,
    stamp: bool,
}

impl BlankClip {
    /// Creates a 24 fps clip of `num_frames` black frames.
    pub fn new(format: VideoFormat, width: usize, height: usize, num_frames: usize) -> Self {
        Self::from_info(ClipInfo {
            format,
            width,
            height,
            fps: Rational::new(24, 1),
            num_frames,
        })
    }

    /// Creates a clip with the given metadata.
    pub fn from_info(info: ClipInfo) -> Self {
        Self { info, stamp: false }
    }

    /// Overrides the frame rate.
    pub fn with_fps(mut self, fps: Rational) -> Self {
        self.info.fps = fps;
        self
    }

    /// Stamps each frame with its number.
    pub fn with_frame_numbers(mut self) -> Self {
        self.stamp = true;
        self
    }
}

impl Clip for BlankClip {
    fn info(&self) -> ClipInfo {
        self.info
    }

    fn get_frame(&self, n: usize) -> Result<FrameData, RenderError> {
        if n >= self.info.num_frames {
            return Err(format!(
                "frame {n} requested from a clip of {} frame(s)",
                self.info.num_frames
            )
            .into());
        }
        let mut frame = FrameData::blank(&self.info);
        if self.stamp
            && let Some(plane) = frame.planes_mut().first_mut()
        {
            let stamp = (n as u32).to_le_bytes();
            let len = plane.len().min(stamp.len());
            plane[..len].copy_from_slice(&stamp[..len]);
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_frames_fail() {
        let clip = BlankClip::new(VideoFormat::GRAY8, 2, 2, 3);
        assert!(clip.get_frame(2).is_ok());
        assert!(clip.get_frame(3).is_err());
    }

    #[test]
    fn stamp_is_truncated_for_tiny_frames() {
        let clip = BlankClip::new(VideoFormat::GRAY8, 1, 2, 300).with_frame_numbers();
        let frame = clip.get_frame(258).unwrap();
        assert_eq!(frame.chunks().next().unwrap(), &[2, 1][..]);
    }
}
