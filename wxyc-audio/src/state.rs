//! Shared visualizer state - the hand-off between audio and render threads
//!
//! The audio side publishes a whole magnitude vector per analysis window; the
//! render side picks up the latest one at its own frame rate. Only the most
//! recent frame matters, so this is a triple buffer rather than a queue.
//!
//! The single writer owns a [`SpectrumPublisher`]; the reading half lives in
//! [`VisualizerState`]. Neither side ever waits for the other.

use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use triple_buffer::{Input, Output, TripleBuffer};
use wxyc_analysis::{BAR_COUNT, HISTORY_LENGTH};

/// One published spectrum frame
#[derive(Debug, Clone, PartialEq)]
struct SpectrumFrame {
    magnitudes: Vec<f32>,
    /// Publications up to and including this one
    frame: u64,
}

/// A consistent copy of the published state
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerSnapshot {
    /// Normalized bar magnitudes, `[0, MAGNITUDE_LIMIT]`
    pub magnitudes: Vec<f32>,
    pub muted: bool,
    /// Number of publications so far
    pub frame: u64,
}

/// What [`VisualizerState::read_into`] copied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Publication number of the copied magnitudes
    pub frame: u64,
    pub muted: bool,
}

/// Writing half of the visualizer state, owned by the analysis thread
pub struct SpectrumPublisher {
    input: Input<SpectrumFrame>,
    frame: u64,
}

impl SpectrumPublisher {
    /// Replace the published vector.
    ///
    /// Missing trailing values publish as zero; extra values are ignored.
    pub fn publish(&mut self, magnitudes: &[f32]) {
        self.frame += 1;

        let buffer = self.input.input_buffer_mut();
        for (i, slot) in buffer.magnitudes.iter_mut().enumerate() {
            *slot = magnitudes.get(i).copied().unwrap_or(0.0);
        }
        buffer.frame = self.frame;

        self.input.publish();
    }

    /// Publish an all-zero vector
    pub fn clear(&mut self) {
        self.publish(&[]);
    }

    /// Publications so far
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Latest spectrum frame plus the mute flag
pub struct VisualizerState {
    bar_count: usize,
    output: Mutex<Output<SpectrumFrame>>,
    /// Handed out once to the writer
    publisher: Mutex<Option<SpectrumPublisher>>,
    muted: AtomicBool,
}

static GLOBAL: OnceLock<Arc<VisualizerState>> = OnceLock::new();

impl VisualizerState {
    /// Create a silent state with `bar_count` bars
    pub fn new(bar_count: usize) -> Self {
        let silence = SpectrumFrame {
            magnitudes: vec![0.0; bar_count],
            frame: 0,
        };
        let (input, output) = TripleBuffer::new(&silence).split();

        Self {
            bar_count,
            output: Mutex::new(output),
            publisher: Mutex::new(Some(SpectrumPublisher { input, frame: 0 })),
            muted: AtomicBool::new(false),
        }
    }

    /// Process-wide instance shared by the audio pipeline and the UI
    pub fn global() -> Arc<VisualizerState> {
        GLOBAL
            .get_or_init(|| Arc::new(VisualizerState::new(BAR_COUNT)))
            .clone()
    }

    /// Claim the writing half. Only the first call gets it.
    pub fn take_publisher(&self) -> Option<SpectrumPublisher> {
        self.publisher.lock().take()
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    /// Copy the latest vector into `out` without allocating.
    ///
    /// Returns `None` only while another reader is copying. `out` shorter
    /// than the bar count receives the leading bars; longer is zero-filled
    /// past the end.
    pub fn read_into(&self, out: &mut [f32]) -> Option<FrameInfo> {
        let mut output = self.output.try_lock()?;
        let latest = output.read();

        for (i, slot) in out.iter_mut().enumerate() {
            *slot = latest.magnitudes.get(i).copied().unwrap_or(0.0);
        }

        Some(FrameInfo {
            frame: latest.frame,
            muted: self.is_muted(),
        })
    }

    /// Consistent copy of the whole state.
    ///
    /// May wait for another reader, never for the writer.
    pub fn snapshot(&self) -> VisualizerSnapshot {
        let mut output = self.output.lock();
        let latest = output.read();
        VisualizerSnapshot {
            magnitudes: latest.magnitudes.clone(),
            muted: self.is_muted(),
            frame: latest.frame,
        }
    }

    /// Publications visible to readers so far
    pub fn frame(&self) -> u64 {
        self.output.lock().read().frame
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }
}

impl Default for VisualizerState {
    fn default() -> Self {
        Self::new(BAR_COUNT)
    }
}

/// Render-side ring of recent frames for temporal smoothing
pub struct VisualizerHistory {
    frames: HeapRb<Vec<f32>>,
    capacity: usize,
    bar_count: usize,
}

impl VisualizerHistory {
    pub fn new(capacity: usize, bar_count: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: HeapRb::new(capacity),
            capacity,
            bar_count,
        }
    }

    /// Record a frame, evicting the oldest once full
    pub fn push(&mut self, magnitudes: &[f32]) {
        let mut frame = vec![0.0; self.bar_count];
        for (slot, &value) in frame.iter_mut().zip(magnitudes) {
            *slot = value;
        }
        self.frames.push_overwrite(frame);
    }

    /// Mean of the recorded frames, per bar
    pub fn averaged(&self) -> Vec<f32> {
        let mut sum = vec![0.0; self.bar_count];
        let count = self.frames.occupied_len();
        if count == 0 {
            return sum;
        }

        for frame in self.frames.iter() {
            for (acc, &value) in sum.iter_mut().zip(frame) {
                *acc += value;
            }
        }
        for acc in &mut sum {
            *acc /= count as f32;
        }
        sum
    }

    pub fn len(&self) -> usize {
        self.frames.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.frames = HeapRb::new(self.capacity);
    }
}

impl Default for VisualizerHistory {
    fn default() -> Self {
        Self::new(HISTORY_LENGTH, BAR_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn with_publisher(bar_count: usize) -> (Arc<VisualizerState>, SpectrumPublisher) {
        let state = Arc::new(VisualizerState::new(bar_count));
        let publisher = state.take_publisher().unwrap();
        (state, publisher)
    }

    #[test]
    fn test_starts_silent() {
        let state = VisualizerState::new(16);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.magnitudes, vec![0.0; 16]);
        assert!(!snapshot.muted);
        assert_eq!(snapshot.frame, 0);
    }

    #[test]
    fn test_publisher_is_handed_out_once() {
        let state = VisualizerState::new(4);
        assert!(state.take_publisher().is_some());
        assert!(state.take_publisher().is_none());
    }

    #[test]
    fn test_publish_replaces_vector() {
        let (state, mut publisher) = with_publisher(4);
        publisher.publish(&[1.0, 2.0, 3.0, 4.0]);
        publisher.publish(&[5.0, 6.0]);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.magnitudes, vec![5.0, 6.0, 0.0, 0.0]);
        assert_eq!(snapshot.frame, 2);
        assert_eq!(publisher.frame(), 2);

        publisher.clear();
        assert_eq!(state.snapshot().magnitudes, vec![0.0; 4]);
        assert_eq!(state.frame(), 3);
    }

    #[test]
    fn test_read_into_sizes() {
        let (state, mut publisher) = with_publisher(3);
        publisher.publish(&[1.0, 2.0, 3.0]);

        let mut short = [0.0; 2];
        state.read_into(&mut short).unwrap();
        assert_eq!(short, [1.0, 2.0]);

        let mut long = [9.0; 5];
        state.read_into(&mut long).unwrap();
        assert_eq!(long, [1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_read_into_reports_frame_of_copied_vector() {
        let (state, mut publisher) = with_publisher(2);
        let mut buf = [0.0; 2];

        assert_eq!(state.read_into(&mut buf).unwrap().frame, 0);
        publisher.publish(&[1.0, 1.0]);
        publisher.publish(&[2.0, 2.0]);

        let info = state.read_into(&mut buf).unwrap();
        assert_eq!(info.frame, 2);
        assert_eq!(buf, [2.0, 2.0]);
    }

    #[test]
    fn test_mute_flag() {
        let state = VisualizerState::new(2);
        state.set_muted(true);
        assert!(state.is_muted());
        assert!(state.snapshot().muted);
        state.set_muted(false);
        assert!(!state.read_into(&mut [0.0; 2]).unwrap().muted);
    }

    #[test]
    fn test_reader_never_sees_torn_frame() {
        let (state, mut publisher) = with_publisher(64);

        let writer = thread::spawn(move || {
            for k in 1..=20_000u32 {
                publisher.publish(&vec![k as f32; 64]);
            }
        });

        let mut buf = vec![0.0; 64];
        while !writer.is_finished() {
            let info = state.read_into(&mut buf).unwrap();
            let first = buf[0];
            assert!(
                buf.iter().all(|&v| v == first),
                "torn frame observed: {:?}",
                buf
            );
            // Each frame carries its own number
            assert_eq!(first, info.frame as f32);
        }
        writer.join().unwrap();
        assert_eq!(state.snapshot().magnitudes, vec![20_000.0; 64]);
    }

    #[test]
    fn test_global_is_shared() {
        let a = VisualizerState::global();
        let b = VisualizerState::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.bar_count(), BAR_COUNT);
    }

    #[test]
    fn test_history_averages_recent_frames() {
        let mut history = VisualizerHistory::new(2, 2);
        assert!(history.is_empty());
        assert_eq!(history.averaged(), vec![0.0, 0.0]);

        history.push(&[10.0, 0.0]);
        history.push(&[20.0, 4.0]);
        assert_eq!(history.averaged(), vec![15.0, 2.0]);

        // Oldest frame falls out
        history.push(&[30.0, 8.0]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.averaged(), vec![25.0, 6.0]);

        history.clear();
        assert!(history.is_empty());
    }
}
