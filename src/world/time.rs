use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct GameTick(pub u64);

/// Counts world ticks of a fixed length.
#[derive(Debug, Clone)]
pub struct GameClock {
    tick_length: Duration,
    tick: GameTick,
}

impl GameClock {
    pub fn new(tick_length: Duration) -> Self {
        let tick_length = if tick_length.is_zero() {
            Duration::from_millis(1)
        } else {
            tick_length
        };
        Self {
            tick_length,
            tick: GameTick(0),
        }
    }

    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    pub fn now(&self) -> GameTick {
        self.tick
    }

    pub fn advance(&mut self) -> GameTick {
        self.tick.0 = self.tick.0.saturating_add(1);
        self.tick
    }

    /// Simulated time covered by the ticks so far.
    pub fn elapsed(&self) -> Duration {
        let nanos = self
            .tick_length
            .as_nanos()
            .saturating_mul(u128::from(self.tick.0))
            .min(u128::from(u64::MAX));
        Duration::from_nanos(nanos as u64)
    }
}

/// Fixed-interval job timer. A zero interval disables the job.
#[derive(Debug, Clone)]
pub struct Schedule {
    interval: Option<Duration>,
    next_due: Option<Instant>,
}

impl Schedule {
    pub fn new(interval: Duration, now: Instant) -> Self {
        let interval = (!interval.is_zero()).then_some(interval);
        let next_due = interval.map(|interval| now + interval);
        Self { interval, next_due }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|next| now >= next)
    }

    pub fn mark_done(&mut self, now: Instant) {
        if let Some(interval) = self.interval {
            self.next_due = Some(now + interval);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTick {
    Cycle(u64),
    Season(u64),
}

/// Accumulates simulated time into day cycles and seasons.
#[derive(Debug, Clone)]
pub struct CycleClock {
    cycle_length: Option<Duration>,
    cycles_per_season: u64,
    pending: Duration,
    cycles: u64,
}

impl CycleClock {
    /// A zero `cycle_length` never fires; a zero `cycles_per_season` never
    /// changes season.
    pub fn new(cycle_length: Duration, cycles_per_season: u64) -> Self {
        Self {
            cycle_length: (!cycle_length.is_zero()).then_some(cycle_length),
            cycles_per_season,
            pending: Duration::ZERO,
            cycles: 0,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn season(&self) -> u64 {
        if self.cycles_per_season == 0 {
            0
        } else {
            self.cycles / self.cycles_per_season
        }
    }

    pub fn advance(&mut self, delta: Duration) -> Vec<CycleTick> {
        let Some(length) = self.cycle_length else {
            return Vec::new();
        };
        self.pending += delta;
        let mut fired = Vec::new();
        while self.pending >= length {
            self.pending -= length;
            self.cycles += 1;
            fired.push(CycleTick::Cycle(self.cycles));
            if self.cycles_per_season > 0 && self.cycles % self.cycles_per_season == 0 {
                fired.push(CycleTick::Season(self.season()));
            }
        }
        fired
    }
}
