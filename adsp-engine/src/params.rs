//! Lock-free parameter link between a control thread and the audio thread.
//!
//! One writer, one reader. The control side pushes whole parameter snapshots
//! into a wait-free ring buffer; the audio side drains it once per sample and
//! keeps only the newest snapshot. Snapshots are validated before they are
//! queued, so the audio thread never sees a rejected record.

use adsp_core::error::{ParamError, Validate};
use log::warn;
use rtrb::{Consumer, Producer, RingBuffer};
use thiserror::Error;

/// Default queue depth for [`link`].
pub const DEFAULT_QUEUE_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EngineError {
    #[error("rejected parameters: {0}")]
    Param(#[from] ParamError),

    #[error("parameter queue is full, snapshot dropped")]
    QueueFull,
}

/// Control-thread end of the link.
pub struct ParamSender<P> {
    tx: Producer<P>,
    sample_rate: f64,
}

/// Audio-thread end of the link.
pub struct ParamReceiver<P> {
    rx: Consumer<P>,
}

/// Create a link that validates snapshots against `sample_rate`.
pub fn link<P: Copy + Validate>(capacity: usize, sample_rate: f64) -> (ParamSender<P>, ParamReceiver<P>) {
    let (tx, rx) = RingBuffer::<P>::new(capacity);
    (ParamSender { tx, sample_rate }, ParamReceiver { rx })
}

impl<P: Copy + Validate> ParamSender<P> {
    /// Validate and enqueue a snapshot.
    pub fn send(&mut self, params: P) -> Result<(), EngineError> {
        if let Err(e) = params.validate(self.sample_rate) {
            warn!("parameter snapshot rejected: {e}");
            return Err(e.into());
        }
        self.tx.push(params).map_err(|_| {
            warn!("parameter queue full ({} slots)", self.tx.buffer().capacity());
            EngineError::QueueFull
        })
    }

    /// Sample rate used for validation. Keep in sync with the engine.
    #[inline] pub fn set_sample_rate(&mut self, sr: f64) { self.sample_rate = sr; }
    #[inline] pub fn sample_rate(&self) -> f64 { self.sample_rate }

    /// Free slots left in the queue.
    #[inline] pub fn slots(&self) -> usize { self.tx.slots() }

    /// Whether the audio side dropped its receiver.
    #[inline] pub fn is_abandoned(&self) -> bool { self.tx.is_abandoned() }
}

impl<P: Copy> ParamReceiver<P> {
    /// Drain the queue and return the newest snapshot, if any arrived.
    #[inline]
    pub fn latest(&mut self) -> Option<P> {
        let mut last = None;
        while let Ok(p) = self.rx.pop() {
            last = Some(p);
        }
        last
    }
}
