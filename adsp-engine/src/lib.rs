//! adsp engine: host-side glue around the `adsp-core` kernels.
//!
//! Crate layout:
//! - [`graph`]  : `Generator` trait and `Engine<G>` wrapper
//! - [`params`] : lock-free single-writer/single-reader parameter link
//! - [`voice`]  : monophonic oscillator → filter → VCA voice
//!
//! The engine avoids heap allocations in the audio thread. Control-path
//! events (construction, rate changes, rejected or dropped parameter
//! snapshots) are reported through the `log` facade; install any logger.

pub mod graph;
pub mod params;
pub mod voice;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use graph::{Engine, Generator};
pub use params::{link, EngineError, ParamReceiver, ParamSender, DEFAULT_QUEUE_SIZE};
pub use voice::{Voice, VoiceParams};
