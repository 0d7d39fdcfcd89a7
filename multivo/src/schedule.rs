// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Round-robin interleaving of several clips into one virtual frame sequence.
//!
//! With `M` clips whose longest length is `L`, the virtual sequence has
//! `M * L` frames. Virtual index `idx` belongs to clip `idx % M` at round
//! `idx / M`. Rounds past a clip's own length are padding: a blank frame is
//! produced for them so the schedule stays regular, and the dispatch loop
//! drops it without writing.

use crate::{
    clip::{Clip, ClipInfo, FrameData, RenderError},
    source::Render,
};

/// Position of a virtual frame in the round-robin schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Index of the clip this frame belongs to.
    pub owner: usize,
    /// Frame number within the owning clip.
    pub round: usize,
    /// `true` when `round` is past the owning clip's length.
    pub padding: bool,
}

/// Index arithmetic for a round-robin interleave of clips of given lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    lengths: Vec<usize>,
    rounds: usize,
}

impl Schedule {
    /// Creates the schedule for clips of the given lengths.
    pub fn new(lengths: Vec<usize>) -> Self {
        let rounds = lengths.iter().copied().max().unwrap_or(0);
        Self { lengths, rounds }
    }

    /// Number of interleaved clips.
    pub fn clips(&self) -> usize {
        self.lengths.len()
    }

    /// Length of the longest clip, i.e. the number of rounds.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Total number of virtual frames, padding included.
    pub fn len(&self) -> usize {
        self.clips() * self.rounds
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clip owning virtual frame `idx`.
    ///
    /// # Panics
    ///
    /// Panics if the schedule has no clips.
    pub fn owner(&self, idx: usize) -> usize {
        idx % self.clips()
    }

    /// Round of virtual frame `idx`.
    ///
    /// # Panics
    ///
    /// Panics if the schedule has no clips.
    pub fn round(&self, idx: usize) -> usize {
        idx / self.clips()
    }

    /// Whether virtual frame `idx` pads a clip shorter than the longest one.
    ///
    /// # Panics
    ///
    /// Panics if the schedule has no clips.
    pub fn is_padding(&self, idx: usize) -> bool {
        self.round(idx) >= self.lengths[self.owner(idx)]
    }

    /// Locates virtual frame `idx`.
    ///
    /// # Panics
    ///
    /// Panics if the schedule has no clips.
    pub fn slot(&self, idx: usize) -> Slot {
        Slot {
            owner: self.owner(idx),
            round: self.round(idx),
            padding: self.is_padding(idx),
        }
    }

    /// Number of real (non-padding) frames in the schedule.
    pub fn real_frames(&self) -> usize {
        self.lengths.iter().sum()
    }
}

/// Virtual clip rendering the interleaved schedule.
///
/// Real slots are forwarded to their clip, padding slots become blank frames
/// shaped like the owning clip.
pub(crate) struct Interleaved<'a> {
    clips: &'a [&'a dyn Clip],
    infos: &'a [ClipInfo],
    schedule: &'a Schedule,
}

impl<'a> Interleaved<'a> {
    pub(crate) fn new(
        clips: &'a [&'a dyn Clip],
        infos: &'a [ClipInfo],
        schedule: &'a Schedule,
    ) -> Self {
        Self {
            clips,
            infos,
            schedule,
        }
    }
}

impl Render for Interleaved<'_> {
    fn render(&self, n: usize) -> Result<FrameData, RenderError> {
        let slot = self.schedule.slot(n);
        if slot.padding {
            Ok(FrameData::blank(&self.infos[slot.owner]))
        } else {
            self.clips[slot.owner].get_frame(slot.round)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uneven_lengths_are_padded() {
        let schedule = Schedule::new(vec![5, 3]);
        assert_eq!(schedule.len(), 10);
        assert_eq!(schedule.real_frames(), 8);

        let real: Vec<(usize, usize)> = (0..schedule.len())
            .map(|idx| schedule.slot(idx))
            .filter(|slot| !slot.padding)
            .map(|slot| (slot.owner, slot.round))
            .collect();
        assert_eq!(
            real,
            [
                (0, 0),
                (1, 0),
                (0, 1),
                (1, 1),
                (0, 2),
                (1, 2),
                (0, 3),
                (0, 4)
            ]
        );
        assert!(schedule.is_padding(7));
        assert!(schedule.is_padding(9));
        assert!(!schedule.is_padding(8));
    }

    #[test]
    fn owner_cycles_in_fixed_order() {
        let schedule = Schedule::new(vec![2, 2, 2]);
        let owners: Vec<usize> = (0..schedule.len()).map(|idx| schedule.owner(idx)).collect();
        assert_eq!(owners, [0, 1, 2, 0, 1, 2]);
        assert!((0..schedule.len()).all(|idx| !schedule.is_padding(idx)));
    }

    #[test]
    fn empty_clips_only_pad() {
        let schedule = Schedule::new(vec![0, 2]);
        assert_eq!(schedule.len(), 4);
        assert!(schedule.is_padding(0));
        assert!(schedule.is_padding(2));
        assert!(!schedule.is_padding(3));

        assert!(Schedule::new(vec![0, 0]).is_empty());
    }

    #[test]
    #[should_panic]
    fn owner_of_an_empty_schedule_panics() {
        Schedule::new(Vec::new()).owner(0);
    }
}
