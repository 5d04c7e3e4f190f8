use std::time::{Duration, Instant};

/// Caps the loop to a fixed rate. `tick` is the only place the game sleeps.
pub(crate) struct FrameClock {
    fps: u32,
    interval: Duration,
    pace: Pace,
    elapsed: Duration,
    frame_time: Duration,
}

enum Pace {
    Realtime { origin: Instant, last: Instant },
    /// Advances by exactly one interval per tick without sleeping.
    #[cfg(test)]
    Stepped,
}

impl FrameClock {
    pub(crate) fn new(fps: u32) -> Self {
        let now = Instant::now();
        Self::with_pace(
            fps,
            Pace::Realtime {
                origin: now,
                last: now,
            },
        )
    }

    #[cfg(test)]
    pub(crate) fn stepped(fps: u32) -> Self {
        Self::with_pace(fps, Pace::Stepped)
    }

    fn with_pace(fps: u32, pace: Pace) -> Self {
        let fps = fps.clamp(1, 240);
        Self {
            fps,
            interval: Duration::from_secs_f64(1.0 / fps as f64),
            pace,
            elapsed: Duration::ZERO,
            frame_time: Duration::ZERO,
        }
    }

    /// Sleeps until one interval has passed since the previous tick and
    /// returns how long the last frame actually took.
    pub(crate) fn tick(&mut self) -> Duration {
        match &mut self.pace {
            Pace::Realtime { origin, last } => {
                spin_sleep(*last + self.interval);
                let now = Instant::now();
                self.frame_time = now.saturating_duration_since(*last);
                self.elapsed = now.saturating_duration_since(*origin);
                *last = now;
            }
            #[cfg(test)]
            Pace::Stepped => {
                self.frame_time = self.interval;
                self.elapsed += self.interval;
            }
        }
        self.frame_time
    }

    /// Monotonic time since the clock was created.
    pub(crate) fn now(&self) -> Duration {
        self.elapsed
    }

    pub(crate) fn fps(&self) -> u32 {
        self.fps
    }
}

fn spin_sleep(end: Instant) {
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_fps_is_62_5_ms() {
        let mut c = FrameClock::stepped(16);
        assert_eq!(c.tick(), Duration::from_micros(62_500));
        assert_eq!(c.fps(), 16);
    }

    #[test]
    fn stepped_clock_accumulates() {
        let mut c = FrameClock::stepped(16);
        for _ in 0..16 {
            c.tick();
        }
        assert_eq!(c.now(), Duration::from_secs(1));
    }

    #[test]
    fn realtime_tick_waits_for_interval() {
        let mut c = FrameClock::new(50);
        let start = Instant::now();
        c.tick();
        let frame_time = c.tick();
        assert!(start.elapsed() >= Duration::from_millis(39));
        assert!(frame_time >= Duration::from_millis(19));
    }
}
