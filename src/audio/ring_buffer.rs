//! Fixed-capacity multi-channel ring buffer shared between the audio callback
//! (single producer) and the render loop (single consumer).
//!
//! Samples are stored as atomics holding the sample's bit pattern, so both
//! sides touch the storage through shared references without locks or
//! `unsafe`. The producer owns the write cursor; the consumer only reads
//! behind it. A read that races a write across the wrap boundary may see a
//! mix of very recent and slightly stale samples, never torn values.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crate::error::VizError;
use crate::params::BufferConfig;

/// Sample types that can live in a [`RingBuffer`]
pub trait Sample: Copy + Default + Send + Sync + 'static {
    /// Atomic cell storing the sample's bit pattern
    type Atomic: Send + Sync;

    fn new_atomic(value: Self) -> Self::Atomic;
    fn load(cell: &Self::Atomic) -> Self;
    fn store(cell: &Self::Atomic, value: Self);
}

impl Sample for f32 {
    type Atomic = AtomicU32;

    fn new_atomic(value: Self) -> AtomicU32 {
        AtomicU32::new(value.to_bits())
    }

    #[inline]
    fn load(cell: &AtomicU32) -> Self {
        f32::from_bits(cell.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(cell: &AtomicU32, value: Self) {
        cell.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Sample for f64 {
    type Atomic = AtomicU64;

    fn new_atomic(value: Self) -> AtomicU64 {
        AtomicU64::new(value.to_bits())
    }

    #[inline]
    fn load(cell: &AtomicU64) -> Self {
        f64::from_bits(cell.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(cell: &AtomicU64, value: Self) {
        cell.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Circular per-channel sample store, overwriting the oldest data when full
pub struct RingBuffer<T: Sample = f32> {
    /// One fixed-length block per channel
    channels: Box<[Box<[T::Atomic]>]>,

    /// Total samples written per channel (monotonic; storage index is this mod capacity)
    written: AtomicUsize,

    capacity: usize,
}

impl<T: Sample> RingBuffer<T> {
    /// Create a zero-filled buffer with the given shape
    pub fn new(config: &BufferConfig) -> Result<Self, VizError> {
        config.validate()?;
        Ok(Self::with_shape(config.channels, config.capacity))
    }

    pub(crate) fn with_shape(channels: usize, capacity: usize) -> Self {
        let channels = (0..channels)
            .map(|_| {
                (0..capacity)
                    .map(|_| T::new_atomic(T::default()))
                    .collect::<Box<[_]>>()
            })
            .collect();

        Self {
            channels,
            written: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Samples retained per channel
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Total samples written per channel since creation
    pub fn total_written(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    /// Append one block of per-channel samples (producer only).
    ///
    /// Every channel advances by the length of the shortest provided slice.
    /// Channels not provided keep their previous contents. If the block is
    /// longer than the capacity only its most recent `capacity` samples are kept.
    /// Never allocates, never blocks.
    pub fn write<S: AsRef<[T]>>(&self, block: &[S]) {
        let len = block.iter().map(|ch| ch.as_ref().len()).min().unwrap_or(0);
        if len == 0 {
            return;
        }

        let skip = len.saturating_sub(self.capacity);
        let start = self.written.load(Ordering::Relaxed) + skip;

        for (storage, source) in self.channels.iter().zip(block) {
            let source = &source.as_ref()[skip..len];
            for (offset, &sample) in source.iter().enumerate() {
                T::store(&storage[(start + offset) % self.capacity], sample);
            }
        }

        self.written.store(start + (len - skip), Ordering::Release);
    }

    /// Append interleaved frames (producer only).
    ///
    /// `source_channels` is the interleave stride of `data`. Buffer channels
    /// beyond the source's channel count repeat the last source channel;
    /// surplus source channels are dropped. Trailing partial frames are ignored.
    pub fn write_interleaved(&self, data: &[T], source_channels: usize) {
        if source_channels == 0 {
            return;
        }
        let frames = data.len() / source_channels;
        if frames == 0 {
            return;
        }

        let skip = frames.saturating_sub(self.capacity);
        let start = self.written.load(Ordering::Relaxed) + skip;

        for (ch, storage) in self.channels.iter().enumerate() {
            let source_ch = ch.min(source_channels - 1);
            for frame in skip..frames {
                let sample = data[frame * source_channels + source_ch];
                T::store(&storage[(start + frame - skip) % self.capacity], sample);
            }
        }

        self.written.store(start + (frames - skip), Ordering::Release);
    }

    /// Copy the most recent `count` samples of each channel, oldest first (consumer only).
    ///
    /// `count` is clamped to the capacity and to each destination's length.
    /// Positions never written read as zero. Returns the number of samples
    /// copied per channel.
    pub fn read_latest<S: AsMut<[T]>>(&self, out: &mut [S], count: usize) -> usize {
        let end = self.written.load(Ordering::Acquire);
        let count = out
            .iter_mut()
            .map(|dest| dest.as_mut().len())
            .fold(count.min(self.capacity), usize::min);

        // Oldest requested position, in storage coordinates
        let first = (end % self.capacity + self.capacity - count) % self.capacity;

        for (storage, dest) in self.channels.iter().zip(out.iter_mut()) {
            let dest = &mut dest.as_mut()[..count];
            for (offset, slot) in dest.iter_mut().enumerate() {
                *slot = T::load(&storage[(first + offset) % self.capacity]);
            }
        }

        count
    }
}
