// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Single-input and multiple-input dispatch loops.
//!
//! Both loops block until every frame has been delivered or the first error
//! occurs. Headers go once to every distinct destination; frames go once to
//! every slot, even when slots alias one destination. Output already written
//! before an error is left as is.

use std::{collections::HashSet, thread};

use tracing::{debug, info, trace};

use crate::{
    Error, Options, Result,
    clip::{Clip, ClipInfo},
    schedule::{Interleaved, Schedule},
    sink::{self, Sink},
    source::{Frame, FrameStream},
    y4m,
};

/// Single-Input-Multiple-Output: writes every frame of `clip` to every
/// present slot of `sinks`.
///
/// With `y4m`, each distinct destination first receives the stream header
/// and every frame is preceded by a `FRAME` marker; formats without a Y4M
/// colorspace are then rejected. Without `y4m`, raw payloads of any format
/// are written. `backlog` bounds the frames in flight and defaults to three
/// per distinct destination.
///
/// # Errors
///
/// - [`Error::NoOutputs`] if `sinks` is empty
/// - [`Error::UnsupportedFormat`] if `y4m` is set and the format has no Y4M tag
/// - [`Error::RenderFailure`] if the engine fails to produce a frame
/// - [`Error::SinkWriteFailure`] if a write or flush fails
pub fn broadcast(
    clip: &dyn Clip,
    sinks: &[Option<Sink>],
    y4m: bool,
    backlog: Option<usize>,
) -> Result<()> {
    broadcast_with(
        clip,
        sinks,
        &Options {
            y4m,
            backlog,
            ..Default::default()
        },
    )
}

/// [`broadcast`] with explicit [`Options`].
pub fn broadcast_with(clip: &dyn Clip, sinks: &[Option<Sink>], options: &Options) -> Result<()> {
    if sinks.is_empty() {
        return Err(Error::NoOutputs);
    }
    let info = clip.info();
    let destinations = sink::distinct(sinks);
    let backlog = options.backlog_for(destinations.len())?;
    let threads = options.threads_for(backlog);

    if options.y4m {
        let header = y4m::header(&info)?;
        for destination in &destinations {
            debug!("Writing Y4M header to \"{}\"", destination.name());
            destination.write_all(header.as_bytes())?;
        }
    }

    debug!(
        "Broadcasting {} frame(s) to {} slot(s), backlog {}, {} worker(s)",
        info.num_frames,
        sinks.len(),
        backlog,
        threads
    );

    let delivered = thread::scope(|scope| -> Result<usize> {
        let frames = FrameStream::spawn(scope, clip, info.num_frames, backlog, threads)?;
        let mut delivered = 0;
        for frame in frames {
            let frame = frame?;
            for sink in sinks.iter().flatten() {
                deliver(sink, &frame, options.y4m)?;
            }
            trace!("Delivered frame {}", frame.index());
            frame.release();
            delivered += 1;
        }
        Ok(delivered)
    })?;

    info!("Broadcast finished: {} frame(s)", delivered);
    Ok(())
}

/// Multiple-Input-Multiple-Output: interleaves `clips` round-robin and
/// writes frame `n` of clip `i` to `sinks[i]`.
///
/// Shorter clips are padded to the longest length; padding frames are
/// rendered as blanks but never written. Headers are built per clip and
/// written once per distinct destination, the first slot naming a
/// destination deciding which clip's header it gets.
///
/// # Errors
///
/// - [`Error::NoInputs`] if `clips` is empty
/// - [`Error::ArityMismatch`] if `clips` and `sinks` differ in length
/// - plus every error [`broadcast`] can return
pub fn interleave(
    clips: &[&dyn Clip],
    sinks: &[Option<Sink>],
    y4m: bool,
    backlog: Option<usize>,
) -> Result<()> {
    interleave_with(
        clips,
        sinks,
        &Options {
            y4m,
            backlog,
            ..Default::default()
        },
    )
}

/// [`interleave`] with explicit [`Options`].
pub fn interleave_with(
    clips: &[&dyn Clip],
    sinks: &[Option<Sink>],
    options: &Options,
) -> Result<()> {
    if clips.len() != sinks.len() {
        return Err(Error::ArityMismatch {
            clips: clips.len(),
            outputs: sinks.len(),
        });
    }
    if clips.is_empty() {
        return Err(Error::NoInputs);
    }

    let infos: Vec<ClipInfo> = clips.iter().map(|clip| clip.info()).collect();
    let schedule = Schedule::new(infos.iter().map(|info| info.num_frames).collect());
    let backlog = options.backlog_for(sink::distinct(sinks).len())?;
    let threads = options.threads_for(backlog);

    if options.y4m {
        let headers = infos.iter().map(y4m::header).collect::<Result<Vec<_>>>()?;
        let mut written = HashSet::new();
        for (slot, header) in sinks.iter().zip(&headers) {
            let Some(destination) = slot else { continue };
            if written.insert(destination.id()) {
                debug!("Writing Y4M header to \"{}\"", destination.name());
                destination.write_all(header.as_bytes())?;
            }
        }
    }

    debug!(
        "Interleaving {} clip(s) over {} round(s), backlog {}, {} worker(s)",
        schedule.clips(),
        schedule.rounds(),
        backlog,
        threads
    );

    let interleaved = Interleaved::new(clips, &infos, &schedule);
    let delivered = thread::scope(|scope| -> Result<usize> {
        let frames = FrameStream::spawn(scope, &interleaved, schedule.len(), backlog, threads)?;
        let mut delivered = 0;
        for frame in frames {
            let frame = frame.map_err(|error| locate(&schedule, error))?;
            let slot = schedule.slot(frame.index());
            if slot.padding {
                trace!("Skipping padding round {} of clip {}", slot.round, slot.owner);
                continue;
            }
            if let Some(sink) = &sinks[slot.owner] {
                deliver(sink, &frame, options.y4m)?;
                trace!("Delivered frame {} of clip {}", slot.round, slot.owner);
                delivered += 1;
            }
            frame.release();
        }
        Ok(delivered)
    })?;

    info!(
        "Interleave finished: {} frame(s) delivered, {} virtual frame(s)",
        delivered,
        schedule.len()
    );
    Ok(())
}

/// Writes the marker (in Y4M mode) and payload of `frame`, then flushes.
fn deliver(sink: &Sink, frame: &Frame, marker: bool) -> Result<()> {
    if marker {
        sink.write_all(y4m::FRAME_MARKER)?;
    }
    for chunk in frame.chunks() {
        sink.write_all(chunk)?;
    }
    sink.flush()
}

/// Translates a render failure at a virtual index into the failing clip and
/// its own frame number.
fn locate(schedule: &Schedule, error: Error) -> Error {
    match error {
        Error::RenderFailure { index, source, .. } => Error::RenderFailure {
            clip: schedule.owner(index),
            index: schedule.round(index),
            source,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::{BlankClip, VideoFormat};

    #[traced_test]
    #[test]
    fn broadcast_logs_completion() {
        let clip = BlankClip::new(VideoFormat::GRAY8, 2, 2, 3);
        let sink = Sink::new("null", std::io::sink());
        broadcast(&clip, &[Some(sink.clone()), Some(sink)], true, None).unwrap();
        assert!(logs_contain("backlog 3"));
        assert!(logs_contain("Broadcast finished: 3 frame(s)"));
    }

    #[traced_test]
    #[test]
    fn interleave_skips_padding_silently() {
        let long = BlankClip::new(VideoFormat::GRAY8, 2, 2, 3);
        let short = BlankClip::new(VideoFormat::YUV444P8, 2, 2, 1);
        let clips: [&dyn Clip; 2] = [&long, &short];
        let sinks = [
            Some(Sink::new("long", std::io::sink())),
            Some(Sink::new("short", std::io::sink())),
        ];
        interleave(&clips, &sinks, true, Some(2)).unwrap();
        assert!(logs_contain("Skipping padding round 2 of clip 1"));
        assert!(logs_contain("4 frame(s) delivered, 6 virtual frame(s)"));
    }

    #[traced_test]
    #[test]
    fn interleave_counts_only_written_frames() {
        let kept = BlankClip::new(VideoFormat::GRAY8, 2, 2, 3);
        let dropped = BlankClip::new(VideoFormat::GRAY8, 2, 2, 3);
        let clips: [&dyn Clip; 2] = [&kept, &dropped];
        let sinks = [Some(Sink::new("kept", std::io::sink())), None];
        interleave(&clips, &sinks, true, None).unwrap();
        assert!(logs_contain("3 frame(s) delivered, 6 virtual frame(s)"));
    }

    #[test]
    fn failures_are_located_in_their_clip() {
        let schedule = Schedule::new(vec![4, 4, 4]);
        let error = locate(
            &schedule,
            Error::RenderFailure {
                clip: 0,
                index: 7,
                source: "boom".into(),
            },
        );
        assert!(matches!(
            error,
            Error::RenderFailure {
                clip: 1,
                index: 2,
                ..
            }
        ));
        assert!(matches!(
            locate(&schedule, Error::NoInputs),
            Error::NoInputs
        ));
    }
}
