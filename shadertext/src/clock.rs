use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::settings::TimeControl;

/// Physical drawable size plus the device pixel ratio it was derived from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, scale_factor: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            scale_factor: if scale_factor.is_finite() && scale_factor > 0.0 {
                scale_factor
            } else {
                1.0
            },
        }
    }

    /// `logical × scale_factor`, rounded to whole pixels.
    pub fn from_logical(width: f32, height: f32, scale_factor: f32) -> Self {
        let physical = |v: f32| (v * scale_factor).round().max(1.0) as u32;
        Self::new(physical(width), physical(height), scale_factor)
    }

    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }

    pub fn resolution(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

/// Everything a frame needs from the clock, computed once before any pass
/// runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameState {
    /// Seconds fed to both passes as `time`.
    pub elapsed: f32,
    pub viewport: Viewport,
    /// The drawable size differs from the previous frame's (always true on
    /// the first frame).
    pub resized: bool,
    pub frame: u64,
}

#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    frame_count: u64,
    last_frame: Option<Instant>,
    frame_intervals: VecDeque<Duration>,
    max_intervals: usize,
    viewport: Viewport,
    pending_viewport: Option<Viewport>,
    last_drawable: Option<[u32; 2]>,
}

impl FrameClock {
    pub fn new(viewport: Viewport) -> Self {
        Self::with_start(viewport, Instant::now())
    }

    pub fn with_start(viewport: Viewport, start: Instant) -> Self {
        Self {
            start,
            frame_count: 0,
            last_frame: None,
            frame_intervals: VecDeque::new(),
            max_intervals: 90,
            viewport,
            pending_viewport: None,
            last_drawable: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Records a size or scale change. It takes effect at the start of the
    /// next frame, never in the middle of one.
    pub fn queue_resize(&mut self, viewport: Viewport) {
        self.pending_viewport = Some(viewport);
    }

    pub fn has_pending_resize(&self) -> bool {
        self.pending_viewport.is_some()
    }

    /// Frozen: `manual_time`. Playing: wall-clock seconds since the clock
    /// started, so un-freezing jumps to real time rather than resuming from
    /// the frozen value.
    pub fn elapsed_at(&self, time: TimeControl, now: Instant) -> f32 {
        if time.is_frozen {
            time.manual_time
        } else {
            now.saturating_duration_since(self.start).as_secs_f32()
        }
    }

    pub fn begin_frame(&mut self, time: TimeControl, now: Instant) -> FrameState {
        if let Some(viewport) = self.pending_viewport.take() {
            self.viewport = viewport;
        }

        let drawable = self.viewport.size();
        let resized = self.last_drawable != Some(drawable);
        self.last_drawable = Some(drawable);

        if let Some(last) = self.last_frame {
            self.record_interval(now.saturating_duration_since(last));
        }
        self.last_frame = Some(now);
        self.frame_count += 1;

        FrameState {
            elapsed: self.elapsed_at(time, now),
            viewport: self.viewport,
            resized,
            frame: self.frame_count,
        }
    }

    pub fn average_fps(&self) -> f32 {
        if self.frame_intervals.is_empty() {
            return 0.0;
        }

        let sum: Duration = self.frame_intervals.iter().copied().sum();
        let avg = sum / self.frame_intervals.len() as u32;

        if avg.is_zero() {
            return 0.0;
        }

        1.0 / avg.as_secs_f32()
    }

    fn record_interval(&mut self, interval: Duration) {
        self.frame_intervals.push_back(interval);
        if self.frame_intervals.len() > self.max_intervals {
            self.frame_intervals.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYING: TimeControl = TimeControl {
        is_frozen: false,
        manual_time: 0.0,
    };

    fn frozen(at: f32) -> TimeControl {
        TimeControl {
            is_frozen: true,
            manual_time: at,
        }
    }

    #[test]
    fn viewport_from_logical_scales_by_dpr() {
        let viewport = Viewport::from_logical(400.0, 300.0, 2.0);
        assert_eq!(viewport.size(), [800, 600]);
        assert_eq!(viewport.resolution(), [800.0, 600.0]);

        let viewport = Viewport::from_logical(401.0, 300.0, 1.5);
        assert_eq!(viewport.size(), [602, 450]);
    }

    #[test]
    fn viewport_rejects_degenerate_values() {
        let viewport = Viewport::new(0, 0, f32::NAN);
        assert_eq!(viewport.size(), [1, 1]);
        assert_eq!(viewport.scale_factor, 1.0);
    }

    #[test]
    fn playing_time_is_wall_clock_since_start() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(Viewport::new(10, 10, 1.0), start);

        let frame = clock.begin_frame(PLAYING, start + Duration::from_millis(1500));
        assert!((frame.elapsed - 1.5).abs() < 1e-6);
    }

    #[test]
    fn frozen_time_is_manual_time() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(Viewport::new(10, 10, 1.0), start);

        let a = clock.begin_frame(frozen(3.25), start + Duration::from_secs(1));
        let b = clock.begin_frame(frozen(3.25), start + Duration::from_secs(9));
        assert_eq!(a.elapsed, 3.25);
        assert_eq!(b.elapsed, 3.25);
    }

    #[test]
    fn unfreezing_resumes_real_time() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(Viewport::new(10, 10, 1.0), start);

        clock.begin_frame(frozen(0.5), start + Duration::from_secs(2));
        let resumed = clock.begin_frame(PLAYING, start + Duration::from_secs(4));
        assert!((resumed.elapsed - 4.0).abs() < 1e-6);
    }

    #[test]
    fn resize_is_reported_once_per_change() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(Viewport::new(100, 50, 1.0), start);

        assert!(clock.begin_frame(PLAYING, start).resized);
        assert!(!clock.begin_frame(PLAYING, start).resized);

        clock.queue_resize(Viewport::new(200, 100, 2.0));
        assert!(clock.has_pending_resize());
        assert_eq!(clock.viewport().size(), [100, 50]);

        let frame = clock.begin_frame(PLAYING, start);
        assert!(frame.resized);
        assert_eq!(frame.viewport.size(), [200, 100]);
        assert!(!clock.has_pending_resize());
        assert!(!clock.begin_frame(PLAYING, start).resized);
    }

    #[test]
    fn scale_change_without_size_change_is_not_a_resize() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(Viewport::new(100, 50, 1.0), start);
        clock.begin_frame(PLAYING, start);

        clock.queue_resize(Viewport::new(100, 50, 2.0));
        let frame = clock.begin_frame(PLAYING, start);
        assert!(!frame.resized);
        assert_eq!(frame.viewport.scale_factor, 2.0);
    }

    #[test]
    fn only_the_latest_queued_resize_applies() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(Viewport::new(100, 50, 1.0), start);
        clock.queue_resize(Viewport::new(10, 10, 1.0));
        clock.queue_resize(Viewport::new(30, 20, 1.0));

        let frame = clock.begin_frame(PLAYING, start);
        assert_eq!(frame.viewport.size(), [30, 20]);
    }

    #[test]
    fn average_fps_tracks_frame_intervals() {
        let start = Instant::now();
        let mut clock = FrameClock::with_start(Viewport::new(10, 10, 1.0), start);
        assert_eq!(clock.average_fps(), 0.0);

        let interval = Duration::from_millis(20);
        for i in 0..5 {
            clock.begin_frame(PLAYING, start + interval * i);
        }

        assert_eq!(clock.frame_count(), 5);
        assert!((clock.average_fps() - 50.0).abs() < 0.01);
    }
}
