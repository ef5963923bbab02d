//! Sample path from the audio side into the render loop.
//!
//! The ring buffer is the only state shared between the two contexts.
//! Producers (live input or a WAV file) write into it; the render loop reads.

mod capture;
mod file;
mod ring_buffer;

// Re-export public types
pub use capture::AudioCapture;
pub use file::{DecodedAudio, FileFeeder};
pub use ring_buffer::{RingBuffer, Sample};
