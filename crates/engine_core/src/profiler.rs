//! Named-section frame profiler with rolling averages.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of samples kept per section and for frame times.
pub const PROFILER_WINDOW: usize = 50;

/// Fixed-capacity rolling window of durations.
#[derive(Debug, Clone, Default)]
pub struct RollingTimes {
    samples: VecDeque<Duration>,
}

impl RollingTimes {
    pub fn push(&mut self, sample: Duration) {
        self.samples.push_back(sample);
        if self.samples.len() > PROFILER_WINDOW {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = &Duration> {
        self.samples.iter()
    }
}

/// Guard returned by [`Profiler::begin_section`]; records the elapsed time on drop.
pub struct SectionTimer<'a> {
    times: &'a mut RollingTimes,
    started: Instant,
}

impl SectionTimer<'_> {
    /// End the section explicitly.
    pub fn end(self) {}
}

impl Drop for SectionTimer<'_> {
    fn drop(&mut self) {
        self.times.push(self.started.elapsed());
    }
}

/// Per-frame profiler keyed by section name.
#[derive(Debug)]
pub struct Profiler {
    sections: BTreeMap<String, RollingTimes>,
    frame_times: RollingTimes,
    frame_start: Instant,
    frames: u64,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            sections: BTreeMap::new(),
            frame_times: RollingTimes::default(),
            frame_start: Instant::now(),
            frames: 0,
        }
    }

    /// Start timing a section. The sample is recorded when the returned guard drops.
    pub fn begin_section(&mut self, name: &str) -> SectionTimer<'_> {
        let times = self.sections.entry(name.to_string()).or_default();
        SectionTimer {
            times,
            started: Instant::now(),
        }
    }

    /// Record the frame time and start the next frame.
    pub fn end_frame(&mut self) {
        let now = Instant::now();
        self.frame_times.push(now - self.frame_start);
        self.frame_start = now;
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn frame_average(&self) -> Duration {
        self.frame_times.average()
    }

    pub fn section(&self, name: &str) -> Option<&RollingTimes> {
        self.sections.get(name)
    }

    /// Log the rolling averages of every section.
    pub fn report(&self) {
        log::info!(
            "Frame time: {:.3}ms over {} frames",
            self.frame_average().as_secs_f64() * 1000.0,
            self.frames
        );
        for (name, times) in &self.sections {
            log::info!(
                "  {}: {:.3}ms ({} samples)",
                name,
                times.average().as_secs_f64() * 1000.0,
                times.len()
            );
        }
    }
}
