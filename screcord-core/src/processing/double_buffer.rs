//! Ping-pong sample buffers shared between the real-time thread and the
//! background writer.
//!
//! Two fixed-capacity buffers are addressed by a selector. The real-time
//! thread appends into the active one; when it fills, `swap` moves it out
//! as a [`Handoff`] and the selector flips. The writer returns the buffer
//! once it has been persisted, and only then can it be written again.
//! Ownership moves with the buffer, so a buffer is never aliased by both
//! threads at once.

use crate::models::audio_models::StreamSpec;

/// Fixed-capacity run of interleaved samples.
///
/// Storage is reserved up front; `push` never reallocates.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample. Returns false when the buffer is already full.
    #[inline]
    pub fn push(&mut self, sample: f32) -> bool {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.samples.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Forget the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// A filled buffer on its way to the writer.
///
/// A hand-off without a buffer only closes the stream; it is sent when
/// recording stops with nothing left to flush.
#[derive(Debug)]
pub struct Handoff {
    /// Selector index the buffer returns to.
    pub slot: usize,
    pub buffer: Option<SampleBuffer>,
    /// False when recording stopped: the writer closes the stream after this flush.
    pub keep_stream: bool,
    pub spec: StreamSpec,
}

impl Handoff {
    /// A request to close the open stream without writing anything.
    pub fn close_only(spec: StreamSpec) -> Self {
        Self {
            slot: 0,
            buffer: None,
            keep_stream: false,
            spec,
        }
    }

    /// The valid samples to persist.
    pub fn samples(&self) -> &[f32] {
        match &self.buffer {
            Some(buffer) => buffer.as_slice(),
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.samples().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }
}

/// Outcome of a single [`DoubleBuffer::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteStatus {
    /// False when no buffer was available (both are with the writer).
    pub appended: bool,
    /// The active buffer cannot take another frame; call `swap` now.
    pub swap_required: bool,
}

#[derive(Debug)]
pub struct DoubleBuffer {
    slots: [Option<SampleBuffer>; 2],
    lent: [bool; 2],
    active: usize,
    capacity: usize,
    frame_width: usize,
}

impl DoubleBuffer {
    /// Create an unallocated pair. Call `allocate` before writing.
    ///
    /// `frame_width` is the channel count; a swap is requested while room
    /// for a whole frame remains, so frames never straddle two buffers.
    pub fn new(capacity: usize, frame_width: usize) -> Self {
        Self {
            slots: [None, None],
            lent: [false, false],
            active: 0,
            capacity,
            frame_width: frame_width.max(1),
        }
    }

    /// Allocate whichever buffers are neither held nor out with the writer.
    ///
    /// Not real-time safe.
    pub fn allocate(&mut self) {
        for slot in 0..2 {
            if self.slots[slot].is_none() && !self.lent[slot] {
                self.slots[slot] = Some(SampleBuffer::new(self.capacity));
            }
        }
    }

    /// Free the buffers currently held. Buffers out with the writer are
    /// freed when they come back.
    ///
    /// Not real-time safe.
    pub fn release(&mut self) {
        self.slots = [None, None];
        self.active = 0;
    }

    /// Whether any buffer is held or lent.
    pub fn is_allocated(&self) -> bool {
        self.slots.iter().any(Option::is_some) || self.lent.iter().any(|&lent| lent)
    }

    /// Whether the active buffer is available for writing.
    pub fn has_active(&self) -> bool {
        self.slots[self.active].is_some()
    }

    /// Append one sample to the active buffer.
    #[inline]
    pub fn write(&mut self, sample: f32) -> WriteStatus {
        match self.slots[self.active].as_mut() {
            Some(buffer) => {
                let appended = buffer.push(sample);
                WriteStatus {
                    appended,
                    swap_required: buffer.remaining() < self.frame_width,
                }
            }
            None => WriteStatus {
                appended: false,
                swap_required: false,
            },
        }
    }

    /// Hand the active buffer off and flip the selector.
    ///
    /// Returns `None` when there is no active buffer to hand off.
    pub fn swap(&mut self, keep_stream: bool, spec: StreamSpec) -> Option<Handoff> {
        let slot = self.active;
        let buffer = self.slots[slot].take()?;
        self.lent[slot] = true;
        self.active = 1 - slot;
        Some(Handoff {
            slot,
            buffer: Some(buffer),
            keep_stream,
            spec,
        })
    }

    /// Take back a buffer the writer has finished with.
    ///
    /// A buffer returning to a slot that was refilled in the meantime is
    /// dropped.
    pub fn restore(&mut self, slot: usize, mut buffer: SampleBuffer) {
        let slot = slot & 1;
        self.lent[slot] = false;
        if self.slots[slot].is_none() {
            buffer.clear();
            self.slots[slot] = Some(buffer);
        }
    }

    /// Forget a buffer the writer has finished with, without keeping it.
    pub fn discard(&mut self, slot: usize) {
        self.lent[slot & 1] = false;
    }

    /// Write position inside the active buffer.
    pub fn cursor(&self) -> usize {
        self.slots[self.active].as_ref().map_or(0, SampleBuffer::len)
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn is_lent(&self, slot: usize) -> bool {
        self.lent[slot & 1]
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
