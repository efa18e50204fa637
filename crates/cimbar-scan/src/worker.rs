//! Background worker and session-side scheduling for live scanning.
//!
//! The session thread owns the [`Scanner`]; heavy per-frame work (YUV
//! conversion, locating, warping, RS decoding) happens on one worker
//! thread. The two sides exchange owned messages over bounded channels:
//! a [`FrameJob`] in, a [`FrameResult`] out, never shared memory.
//!
//! The session enforces one outstanding job at a time (new camera frames
//! are dropped while a job is in flight) and throttles dispatch to about
//! 4 Hz regardless of job completion latency, so the worker can never
//! queue up under fluctuating load.

use crate::scanner::{ScanProgress, Scanner};
use crate::yuv::{yuv_to_rgb, YuvPlanes};
use cimbar_decode::{decode_photo_frame, TuningConfig};
use cimbar_locate::{FrameLocator, Rect};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use log::debug;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Minimum spacing between job dispatches.
pub const DISPATCH_INTERVAL: Duration = Duration::from_millis(250);

/// One camera frame's worth of work, owned by the worker once sent.
#[derive(Clone, Debug)]
pub struct FrameJob {
    pub planes: YuvPlanes,
    pub config: TuningConfig,
    pub locked_frame_size: Option<u32>,
}

/// Worker output. `bytes` is `None` when nothing decodable was found,
/// which is routine on a live feed.
#[derive(Clone, Debug)]
pub struct FrameResult {
    pub bytes: Option<Vec<u8>>,
    pub frame_size: Option<u32>,
    pub barcode_rect: Option<Rect>,
}

fn run_job(job: &FrameJob) -> FrameResult {
    let rgb = yuv_to_rgb(&job.planes);
    let locator = FrameLocator::default();

    let Ok(located) = locator.locate(&rgb.view()) else {
        return FrameResult {
            bytes: None,
            frame_size: None,
            barcode_rect: None,
        };
    };
    let rect = located.rect;

    match decode_photo_frame(
        &rgb.view(),
        &located,
        &job.config,
        job.locked_frame_size,
        false,
    ) {
        Ok(decoded) => FrameResult {
            bytes: Some(decoded.bytes),
            frame_size: Some(decoded.frame_size),
            barcode_rect: Some(rect),
        },
        Err(_) => FrameResult {
            bytes: None,
            frame_size: None,
            barcode_rect: Some(rect),
        },
    }
}

struct Worker {
    jobs: Sender<FrameJob>,
    results: Receiver<FrameResult>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn() -> Self {
        let (job_tx, job_rx) = bounded::<FrameJob>(1);
        let (result_tx, result_rx) = bounded::<FrameResult>(1);
        let handle = std::thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                let result = run_job(&job);
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });
        Self {
            jobs: job_tx,
            results: result_rx,
            handle: Some(handle),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // closing the job channel lets the thread run off the end
        let (dead_tx, _) = bounded(1);
        drop(std::mem::replace(&mut self.jobs, dead_tx));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Session-thread face of the worker: dispatch throttling, single
/// outstanding job, and scanner state updates.
pub struct ScanSession {
    worker: Worker,
    scanner: Scanner,
    cfg: TuningConfig,
    in_flight: bool,
    discard_in_flight: bool,
    last_dispatch: Option<Instant>,
}

impl ScanSession {
    pub fn new(cfg: TuningConfig) -> Self {
        Self {
            worker: Worker::spawn(),
            scanner: Scanner::new(cfg.clone()),
            cfg,
            in_flight: false,
            discard_in_flight: false,
            last_dispatch: None,
        }
    }

    #[inline]
    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    #[inline]
    pub fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    /// Offer one camera frame. Returns whether it was dispatched; frames
    /// arriving while a job is in flight, or faster than the dispatch
    /// interval, are dropped.
    pub fn offer_frame(&mut self, planes: YuvPlanes) -> bool {
        if self.in_flight {
            return false;
        }
        if let Some(t) = self.last_dispatch {
            if t.elapsed() < DISPATCH_INTERVAL {
                return false;
            }
        }

        let job = FrameJob {
            planes,
            config: self.cfg.clone(),
            locked_frame_size: self.scanner.locked_frame_size(),
        };
        match self.worker.jobs.try_send(job) {
            Ok(()) => {
                self.in_flight = true;
                self.discard_in_flight = false;
                self.last_dispatch = Some(Instant::now());
                true
            }
            Err(_) => false,
        }
    }

    /// Drain a finished job into scanner state, if one is ready.
    pub fn poll(&mut self) -> Option<ScanProgress> {
        let result = match self.worker.results.try_recv() {
            Ok(r) => r,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
        };
        self.in_flight = false;

        if self.discard_in_flight {
            debug!("session: discarding result from a cancelled job");
            self.discard_in_flight = false;
            return None;
        }

        let bytes = result.bytes?;
        let frame_size = result.frame_size?;
        Some(self.scanner.process_decoded(bytes, frame_size))
    }

    /// Block until the in-flight job (if any) finishes, then ingest it.
    pub fn poll_blocking(&mut self) -> Option<ScanProgress> {
        if !self.in_flight {
            return None;
        }
        let result = self.worker.results.recv().ok()?;
        self.in_flight = false;
        if self.discard_in_flight {
            self.discard_in_flight = false;
            return None;
        }
        let bytes = result.bytes?;
        let frame_size = result.frame_size?;
        Some(self.scanner.process_decoded(bytes, frame_size))
    }

    /// Discard the in-flight job's result (if any) when it arrives and
    /// reset all scan state.
    pub fn cancel(&mut self) {
        if self.in_flight {
            self.discard_in_flight = true;
        }
        self.scanner.reset();
    }
}
