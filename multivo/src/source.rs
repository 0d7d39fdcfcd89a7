// SPDX-FileCopyrightText: 2025 Contributors to the multivo project.
// SPDX-License-Identifier: Apache-2.0

//! Ordered, backlog-bounded frame stream over a rendering engine.
//!
//! [`FrameStream`] issues render requests to a pool of scoped worker threads
//! and yields the results strictly in index order. At most `backlog` frames
//! are in flight at any time, counting both frames still rendering and frames
//! handed to the consumer but not yet released.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
};

use crossbeam_channel::{Receiver, Sender};
use tracing::{error, trace};

use crate::{
    Error, Result,
    clip::{Clip, FrameData, RenderError},
};

/// Something that can render frame `n` of a finite sequence.
pub(crate) trait Render: Sync {
    fn render(&self, n: usize) -> core::result::Result<FrameData, RenderError>;
}

impl<'a> Render for dyn Clip + 'a {
    fn render(&self, n: usize) -> core::result::Result<FrameData, RenderError> {
        self.get_frame(n)
    }
}

type Reply = core::result::Result<FrameData, RenderError>;

struct Job {
    index: usize,
    reply: Sender<Reply>,
}

/// Returns one backlog slot when dropped.
struct Release(Arc<AtomicUsize>);

impl Drop for Release {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A rendered frame handed out by [`FrameStream`].
///
/// Holding a frame keeps its backlog slot occupied. The slot is returned by
/// [`Frame::release`] or when the frame is dropped.
pub(crate) struct Frame {
    index: usize,
    data: FrameData,
    _release: Release,
}

impl Frame {
    /// Position of this frame in the stream.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Plane buffers in write order.
    pub fn chunks(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks()
    }

    /// Releases the frame, allowing the stream to request another one.
    pub fn release(self) {
        trace!("Released frame {}", self.index);
    }
}

/// Lazily rendered, strictly ordered sequence of [`Frame`]s.
///
/// The stream ends after the last frame, or right after the first error it
/// yields. An error or a drop cancels every queued request; workers finish
/// the render they are busy with, discard it and exit.
pub(crate) struct FrameStream {
    jobs: Option<Sender<Job>>,
    cancelled: Arc<AtomicBool>,
    pending: VecDeque<(usize, Receiver<Reply>)>,
    next_request: usize,
    len: usize,
    backlog: usize,
    in_flight: Arc<AtomicUsize>,
    finished: bool,
}

impl FrameStream {
    /// Spawns `threads` render workers inside `scope` and returns a stream
    /// over frames `0..len` of `producer`.
    pub(crate) fn spawn<'scope, 'env, R>(
        scope: &'scope thread::Scope<'scope, 'env>,
        producer: &'env R,
        len: usize,
        backlog: usize,
        threads: usize,
    ) -> Result<Self>
    where
        R: Render + ?Sized,
    {
        if backlog == 0 {
            return Err(Error::InvalidBacklog);
        }
        let (jobs, queue) = crossbeam_channel::unbounded::<Job>();
        let cancelled = Arc::new(AtomicBool::new(false));
        for worker in 0..threads.clamp(1, backlog) {
            let queue = queue.clone();
            let cancelled = cancelled.clone();
            thread::Builder::new()
                .name(format!("multivo-render-{worker}"))
                .spawn_scoped(scope, move || {
                    for job in queue.iter() {
                        if cancelled.load(Ordering::Acquire) {
                            trace!("Worker {} dropping frame {}", worker, job.index);
                            continue;
                        }
                        trace!("Worker {} rendering frame {}", worker, job.index);
                        // The consumer may be gone after an error; nothing to do then.
                        let _ = job.reply.send(producer.render(job.index));
                    }
                })
                .map_err(|error| Error::Other(format!("Failed to spawn render worker: {error}")))?;
        }
        Ok(Self {
            jobs: Some(jobs),
            cancelled,
            pending: VecDeque::with_capacity(backlog),
            next_request: 0,
            len,
            backlog,
            in_flight: Arc::new(AtomicUsize::new(0)),
            finished: false,
        })
    }

    /// Frames requested or held by the consumer and not yet released.
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Issues render requests until the backlog is full or every frame has
    /// been requested.
    fn fill(&mut self) {
        let Some(jobs) = self.jobs.as_ref() else {
            return;
        };
        while self.next_request < self.len && self.in_flight() < self.backlog {
            let index = self.next_request;
            let (reply, receiver) = crossbeam_channel::bounded(1);
            if jobs.send(Job { index, reply }).is_err() {
                break;
            }
            self.in_flight.fetch_add(1, Ordering::AcqRel);
            self.pending.push_back((index, receiver));
            self.next_request += 1;
        }
    }

    fn fail(&mut self, error: Error) -> Option<Result<Frame>> {
        self.cancel();
        self.finished = true;
        self.pending.clear();
        Some(Err(error))
    }

    /// Stops workers from starting any render still queued.
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.jobs = None;
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Iterator for FrameStream {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        self.fill();
        let Some((index, receiver)) = self.pending.pop_front() else {
            if self.next_request >= self.len {
                self.finished = true;
                self.jobs = None;
                return None;
            }
            let backlog = self.backlog;
            return self.fail(Error::BacklogExhausted { backlog });
        };
        // Owns the slot taken in `fill` from here on, whatever the outcome.
        let release = Release(self.in_flight.clone());
        match receiver.recv() {
            Ok(Ok(data)) => Some(Ok(Frame {
                index,
                data,
                _release: release,
            })),
            Ok(Err(source)) => {
                error!("Failed to render frame {}: {}", index, source);
                self.fail(Error::RenderFailure {
                    clip: 0,
                    index,
                    source,
                })
            }
            Err(_) => self.fail(Error::Other(format!(
                "Render worker exited before delivering frame {index}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Mutex, atomic::AtomicBool},
        time::Duration,
    };

    use super::*;

    /// Produces one-byte frames holding their index, recording the highest
    /// index ever requested.
    #[derive(Default)]
    struct Counter {
        highest: Mutex<Option<usize>>,
        fail_at: Option<usize>,
        calls: AtomicUsize,
        slow: AtomicBool,
        pause: Option<Duration>,
    }

    impl Render for Counter {
        fn render(&self, n: usize) -> core::result::Result<FrameData, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            {
                let mut highest = self.highest.lock().unwrap();
                *highest = Some(highest.map_or(n, |h| h.max(n)));
            }
            if self.slow.load(Ordering::SeqCst) && n % 2 == 0 {
                thread::sleep(Duration::from_millis(5));
            }
            if let Some(pause) = self.pause {
                thread::sleep(pause);
            }
            if self.fail_at == Some(n) {
                return Err(format!("frame {n} exploded").into());
            }
            Ok(FrameData::from_planes(vec![vec![n as u8]]))
        }
    }

    #[test]
    fn yields_in_order_despite_out_of_order_completion() {
        let counter = Counter::default();
        counter.slow.store(true, Ordering::SeqCst);
        let indices: Vec<usize> = thread::scope(|scope| {
            FrameStream::spawn(scope, &counter, 20, 4, 4)
                .unwrap()
                .map(|frame| {
                    let frame = frame.unwrap();
                    let byte = frame.chunks().next().unwrap()[0];
                    assert_eq!(byte as usize, frame.index());
                    frame.index()
                })
                .collect()
        });
        assert_eq!(indices, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn never_exceeds_backlog() {
        let counter = Counter::default();
        let backlog = 3;
        thread::scope(|scope| {
            let mut stream = FrameStream::spawn(scope, &counter, 50, backlog, 2).unwrap();
            while let Some(frame) = stream.next() {
                let frame = frame.unwrap();
                assert!(stream.in_flight() <= backlog);
                let highest = counter.highest.lock().unwrap().unwrap();
                assert!(highest < frame.index() + backlog);
                frame.release();
                assert!(stream.in_flight() < backlog);
            }
            assert_eq!(stream.in_flight(), 0);
        });
        assert_eq!(counter.calls.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn holding_every_slot_is_reported() {
        let counter = Counter::default();
        thread::scope(|scope| {
            let mut stream = FrameStream::spawn(scope, &counter, 5, 2, 1).unwrap();
            let first = stream.next().unwrap().unwrap();
            let second = stream.next().unwrap().unwrap();
            assert!(matches!(
                stream.next(),
                Some(Err(Error::BacklogExhausted { backlog: 2 }))
            ));
            assert!(stream.next().is_none());
            drop((first, second));
        });
    }

    #[test]
    fn render_failure_ends_the_stream() {
        let counter = Counter {
            fail_at: Some(3),
            ..Default::default()
        };
        thread::scope(|scope| {
            let mut stream = FrameStream::spawn(scope, &counter, 10, 2, 2).unwrap();
            for expected in 0..3 {
                assert_eq!(stream.next().unwrap().unwrap().index(), expected);
            }
            match stream.next() {
                Some(Err(Error::RenderFailure { index, source, .. })) => {
                    assert_eq!(index, 3);
                    assert_eq!(source.to_string(), "frame 3 exploded");
                }
                _ => panic!("expected a render failure"),
            }
            assert!(stream.next().is_none());
        });
        // Prefetch never runs further than the backlog past the failure.
        assert!(counter.highest.lock().unwrap().unwrap() <= 4);
    }

    #[test]
    fn failure_cancels_queued_renders() {
        let counter = Counter {
            fail_at: Some(0),
            pause: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        thread::scope(|scope| {
            let mut stream = FrameStream::spawn(scope, &counter, 32, 16, 1).unwrap();
            assert!(matches!(
                stream.next(),
                Some(Err(Error::RenderFailure { index: 0, .. }))
            ));
        });
        // Frame 0, plus at most the renders already started when it failed.
        assert!(counter.calls.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn dropping_the_stream_cancels_queued_renders() {
        let counter = Counter {
            pause: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        thread::scope(|scope| {
            let mut stream = FrameStream::spawn(scope, &counter, 32, 16, 1).unwrap();
            stream.next().unwrap().unwrap().release();
        });
        assert!(counter.calls.load(Ordering::SeqCst) <= 4);
    }

    #[test]
    fn empty_stream_ends_immediately() {
        let counter = Counter::default();
        thread::scope(|scope| {
            let mut stream = FrameStream::spawn(scope, &counter, 0, 1, 1).unwrap();
            assert!(stream.next().is_none());
        });
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn zero_backlog_is_rejected() {
        let counter = Counter::default();
        thread::scope(|scope| {
            assert!(matches!(
                FrameStream::spawn(scope, &counter, 3, 0, 1),
                Err(Error::InvalidBacklog)
            ));
        });
    }
}
