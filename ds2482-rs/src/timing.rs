use embedded_hal::delay::DelayNs;

/// Busy-wait budget, in ticks.
pub(crate) const BUSY_TIMEOUT_MS: u32 = 10;
/// Presence-pulse budget of a bus reset, in ticks.
pub(crate) const RESET_TIMEOUT_MS: u32 = 5;

/// Length of one poll tick.
const TICK_MS: u32 = 1;

/// Monotonic tick counter of one bounded wait.
///
/// Budgets passed to [`PollTimer::tick`] are measured from the start of the timer,
/// so consecutive polls on one timer share the same origin.
#[derive(Debug, Default)]
pub(crate) struct PollTimer {
    elapsed: u32,
}

impl PollTimer {
    pub(crate) fn start() -> Self {
        Self::default()
    }

    /// Ticks elapsed since the start.
    pub(crate) fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Sleeps one tick, unless `budget` ticks have already elapsed.
    ///
    /// Returns `false` once the budget is spent.
    pub(crate) fn tick<D: DelayNs>(&mut self, delay: &mut D, budget: u32) -> bool {
        if self.elapsed >= budget {
            return false;
        }
        delay.delay_ms(TICK_MS);
        self.elapsed += TICK_MS;
        true
    }
}
