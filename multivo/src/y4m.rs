// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! YUV4MPEG2 stream header and frame marker.

use crate::{
    Error, Result,
    clip::{ClipInfo, ColorFamily, VideoFormat},
};

/// Stream signature starting every header line.
pub const MAGIC: &str = "YUV4MPEG2";

/// Marker written before every frame payload in Y4M mode.
pub const FRAME_MARKER: &[u8] = b"FRAME\n";

/// Returns the Y4M colorspace tag (the part after `C`) for `format`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for RGB formats and for YUV
/// subsampling combinations that Y4M cannot describe.
pub fn colorspace_tag(format: &VideoFormat) -> Result<String> {
    let deep = format.bits_per_sample > 8;
    match format.color_family {
        ColorFamily::Gray if deep => Ok(format!("mono{}", format.bits_per_sample)),
        ColorFamily::Gray => Ok("mono".to_string()),
        ColorFamily::Yuv => {
            let tag = match (format.subsampling_w, format.subsampling_h) {
                (1, 1) => "420",
                (1, 0) => "422",
                (0, 0) => "444",
                (2, 2) => "410",
                (2, 0) => "411",
                (0, 1) => "440",
                (w, h) => {
                    return Err(Error::UnsupportedFormat(format!(
                        "YUV subsampling {w}:{h} has no Y4M colorspace"
                    )));
                }
            };
            if deep {
                Ok(format!("{tag}p{}", format.bits_per_sample))
            } else {
                Ok(tag.to_string())
            }
        }
        ColorFamily::Rgb => Err(Error::UnsupportedFormat(
            "RGB color family is not supported by Y4M".to_string(),
        )),
    }
}

/// Builds the newline-terminated Y4M stream header for a clip.
///
/// ```
/// use multivo::{ClipInfo, Rational, VideoFormat, y4m};
///
/// let info = ClipInfo {
///     format: VideoFormat::YUV420P10,
///     width: 1920,
///     height: 1080,
///     fps: Rational::new(24000, 1001),
///     num_frames: 240,
/// };
/// assert_eq!(
///     y4m::header(&info)?,
///     "YUV4MPEG2 C420p10 W1920 H1080 F24000:1001 Ip A0:0 XLENGTH=240\n"
/// );
/// # Ok::<(), multivo::Error>(())
/// ```
pub fn header(info: &ClipInfo) -> Result<String> {
    let tag = colorspace_tag(&info.format)?;
    Ok(format!(
        "{MAGIC} C{tag} W{} H{} F{}:{} Ip A0:0 XLENGTH={}\n",
        info.width, info.height, info.fps.numerator, info.fps.denominator, info.num_frames
    ))
}
