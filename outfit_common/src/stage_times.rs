use std::time::{Duration, Instant};

/// Wall-clock time spent in each pipeline stage for one image.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageTimes {
    pub locate: Duration,
    pub segment: Duration,
    pub cluster: Duration,
    pub describe: Duration,
}

impl StageTimes {
    pub fn total(&self) -> Duration {
        self.locate + self.segment + self.cluster + self.describe
    }
}

/// Runs `f`, adding its elapsed time to `slot`.
pub fn timed<T>(slot: &mut Duration, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    *slot += start.elapsed();
    out
}
