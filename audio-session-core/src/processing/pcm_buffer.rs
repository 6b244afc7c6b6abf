use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::models::audio_models::{AudioLevels, CaptureFormat};

#[derive(Debug)]
struct Slot {
    channels: Vec<Vec<f32>>,
    /// Frames written so far into a slot that is still being filled.
    filled: usize,
}

impl Slot {
    fn new(channels: usize, frame_length: usize) -> Self {
        Self {
            channels: vec![vec![0.0; frame_length]; channels],
            filled: 0,
        }
    }
}

/// Fixed-capacity, per-channel PCM double buffer shared between exactly one
/// producer (the audio thread) and one consumer.
///
/// Discipline:
/// - The producer fills the back slot and only ever `try_lock`s it. If the
///   consumer is holding that slot, the incoming samples are dropped and
///   counted instead of waiting.
/// - A slot is published by storing its index in `front` and bumping
///   `published`, both with release ordering, once it holds `frame_length`
///   frames. Packets of any size accumulate across calls.
/// - The consumer locks the front slot and re-checks `front` before handing
///   out a view, so a view always covers one complete, immutable frame.
///
/// Allocation only happens in [`PcmBuffer::new`].
#[derive(Debug)]
pub struct PcmBuffer {
    slots: [Mutex<Slot>; 2],
    front: AtomicUsize,
    published: AtomicU64,
    consumed: AtomicU64,
    dropped: AtomicU64,
    channels: usize,
    frame_length: usize,
}

impl PcmBuffer {
    pub fn new(channels: usize, frame_length: usize) -> Self {
        Self {
            slots: [
                Mutex::new(Slot::new(channels, frame_length)),
                Mutex::new(Slot::new(channels, frame_length)),
            ],
            front: AtomicUsize::new(0),
            published: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            channels,
            frame_length,
        }
    }

    pub fn for_format(format: &CaptureFormat) -> Self {
        Self::new(format.channels as usize, format.frame_length as usize)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Producer side: deinterleave `samples` into the back slot.
    ///
    /// Source channels beyond the buffer's channel count are ignored; missing
    /// ones are written as silence.
    pub fn write_interleaved(&self, samples: &[f32], source_channels: usize) {
        if source_channels == 0 || self.channels == 0 || self.frame_length == 0 {
            return;
        }

        let total_frames = samples.len() / source_channels;
        let mut offset = 0;

        while offset < total_frames {
            let back = 1 - self.front.load(Ordering::Acquire);
            let Some(mut slot) = self.slots[back].try_lock() else {
                let lost = (total_frames - offset) * source_channels;
                self.dropped.fetch_add(lost as u64, Ordering::Relaxed);
                return;
            };

            let start = slot.filled;
            let count = (self.frame_length - start).min(total_frames - offset);

            for (ch, dest) in slot.channels.iter_mut().enumerate() {
                let dest = &mut dest[start..start + count];
                if ch < source_channels {
                    for (i, sample) in dest.iter_mut().enumerate() {
                        *sample = samples[(offset + i) * source_channels + ch];
                    }
                } else {
                    dest.fill(0.0);
                }
            }

            slot.filled += count;
            offset += count;

            if slot.filled == self.frame_length {
                slot.filled = 0;
                drop(slot);
                self.front.store(back, Ordering::Release);
                self.published.fetch_add(1, Ordering::Release);
            }
        }
    }

    /// Consumer side: borrow the most recently published frame.
    ///
    /// Before the first publish this is a frame of silence.
    pub fn read(&self) -> PcmView<'_> {
        loop {
            let index = self.front.load(Ordering::Acquire);
            let slot = self.slots[index].lock();
            if self.front.load(Ordering::Acquire) == index {
                return PcmView { slot };
            }
        }
    }

    /// True if a frame was published since the last call. Read-and-clear.
    pub fn consume_updated(&self) -> bool {
        let published = self.published.load(Ordering::Acquire);
        self.consumed.swap(published, Ordering::AcqRel) != published
    }

    pub fn frames_published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }

    pub fn samples_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Borrowed read-only view of one published frame.
///
/// The producer cannot touch this frame while the view is alive.
pub struct PcmView<'a> {
    slot: MutexGuard<'a, Slot>,
}

impl PcmView<'_> {
    pub fn channels(&self) -> usize {
        self.slot.channels.len()
    }

    pub fn samples_per_channel(&self) -> usize {
        self.slot.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.slot.channels.get(index).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.slot.channels.iter().map(Vec::as_slice)
    }

    /// Copy into `out` as `channel 0 | channel 1 | ...`, replacing its contents.
    pub fn copy_planar_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(self.channels() * self.samples_per_channel());
        for channel in self.iter() {
            out.extend_from_slice(channel);
        }
    }

    /// RMS across all channels and the absolute peak.
    pub fn levels(&self) -> AudioLevels {
        if self.channels() == 0 {
            return AudioLevels::default();
        }
        // Channels share one length, so the overall mean square is the mean of theirs.
        let mean_sq = self
            .iter()
            .map(|c| AudioLevels::rms_level(c).powi(2))
            .sum::<f32>()
            / self.channels() as f32;
        let peak = self.iter().map(AudioLevels::peak_level).fold(0.0f32, f32::max);
        AudioLevels {
            rms: mean_sq.sqrt(),
            peak,
        }
    }
}
