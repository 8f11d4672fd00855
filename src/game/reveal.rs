use std::iter::FusedIterator;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use super::catalog::Catalog;
use super::draw::DrawOutcome;

/// Highlight pacing: each step waits `interval`, then `interval *= acceleration`
/// until it reaches `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealTiming {
    pub start_interval: Duration,
    pub acceleration: f64,
    pub ceiling: Duration,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self {
            start_interval: Duration::from_millis(50),
            acceleration: 1.08,
            ceiling: Duration::from_millis(300),
        }
    }
}

impl RevealTiming {
    /// A run only terminates when the interval actually grows.
    pub fn is_valid(&self) -> bool {
        self.acceleration.is_finite() && self.acceleration > 1.0 && !self.start_interval.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealPhase {
    #[default]
    Idle,
    Accelerating,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealEvent {
    /// Move the highlight to `index` after waiting `delay`.
    Highlight { index: usize, delay: Duration },
    /// Final position. Emitted exactly once, last.
    Settle { index: usize, delay: Duration },
}

impl RevealEvent {
    pub fn index(&self) -> usize {
        match *self {
            RevealEvent::Highlight { index, .. } | RevealEvent::Settle { index, .. } => index,
        }
    }

    pub fn delay(&self) -> Duration {
        match *self {
            RevealEvent::Highlight { delay, .. } | RevealEvent::Settle { delay, .. } => delay,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevealError {
    #[error("a reveal is already running")]
    AlreadyRunning,
    #[error("nothing to reveal: the catalog is empty")]
    EmptyCatalog,
    #[error("won item '{0}' is not in the catalog")]
    UnknownItem(String),
    #[error("reveal timing never reaches its ceiling")]
    InvalidTiming,
}

/// One finite, decelerating pass over the catalog grid.
#[derive(Debug, Clone)]
pub struct RevealRun {
    len: usize,
    cursor: usize,
    interval_secs: f64,
    acceleration: f64,
    ceiling_secs: f64,
    final_index: usize,
    settle_pending: bool,
    finished: bool,
}

impl RevealRun {
    fn new(timing: RevealTiming, len: usize, final_index: usize) -> Self {
        Self {
            len,
            cursor: 0,
            interval_secs: timing.start_interval.as_secs_f64(),
            acceleration: timing.acceleration,
            ceiling_secs: timing.ceiling.as_secs_f64(),
            final_index,
            settle_pending: false,
            finished: false,
        }
    }
}

impl Iterator for RevealRun {
    type Item = RevealEvent;

    fn next(&mut self) -> Option<RevealEvent> {
        if self.finished {
            return None;
        }
        if self.settle_pending {
            self.finished = true;
            return Some(RevealEvent::Settle {
                index: self.final_index,
                delay: Duration::from_secs_f64(self.interval_secs.min(self.ceiling_secs)),
            });
        }

        self.cursor = (self.cursor + 1) % self.len;
        let delay = Duration::from_secs_f64(self.interval_secs);
        self.interval_secs *= self.acceleration;
        if self.interval_secs >= self.ceiling_secs {
            self.settle_pending = true;
        }
        Some(RevealEvent::Highlight {
            index: self.cursor,
            delay,
        })
    }
}

impl FusedIterator for RevealRun {}

/// `Idle -> Accelerating -> Settled` driver around a [`RevealRun`].
#[derive(Debug, Clone, Default)]
pub struct RevealSequencer {
    timing: RevealTiming,
    phase: RevealPhase,
    generation: u64,
    run: Option<RevealRun>,
}

impl RevealSequencer {
    pub fn new(timing: RevealTiming) -> Self {
        Self {
            timing,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_timing(&mut self, timing: RevealTiming) {
        self.timing = timing;
    }

    /// Begin a reveal converging on `outcome`. Returns the run's generation.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        outcome: &DrawOutcome,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<u64, RevealError> {
        if self.phase == RevealPhase::Accelerating {
            return Err(RevealError::AlreadyRunning);
        }
        if catalog.is_empty() {
            return Err(RevealError::EmptyCatalog);
        }
        if !self.timing.is_valid() {
            return Err(RevealError::InvalidTiming);
        }

        let final_index = match outcome.item() {
            Some(item) => catalog
                .position_of(&item.id)
                .ok_or_else(|| RevealError::UnknownItem(item.id.clone()))?,
            // Cosmetic only: nothing is granted.
            None => rng.random_range(0..catalog.len()),
        };

        self.generation += 1;
        self.phase = RevealPhase::Accelerating;
        self.run = Some(RevealRun::new(self.timing, catalog.len(), final_index));
        Ok(self.generation)
    }

    /// Pull the next step of the running reveal, if any.
    pub fn next_event(&mut self) -> Option<RevealEvent> {
        let event = self.run.as_mut()?.next()?;
        if let RevealEvent::Settle { .. } = event {
            self.phase = RevealPhase::Settled;
            self.run = None;
        }
        Some(event)
    }

    /// Drop any running reveal. Steps scheduled under the old generation become stale.
    pub fn cancel(&mut self) {
        self.run = None;
        self.phase = RevealPhase::Idle;
        self.generation += 1;
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn drain(seq: &mut RevealSequencer) -> Vec<RevealEvent> {
        std::iter::from_fn(|| seq.next_event()).collect()
    }

    #[test]
    fn run__settles_on_won_item() {
        let catalog = Catalog::with_defaults();
        let item = catalog.at(2).unwrap().clone();
        let mut seq = RevealSequencer::new(RevealTiming::default());
        let mut rng = StdRng::seed_from_u64(11);

        seq.start(&DrawOutcome::Won(item), &catalog, &mut rng).unwrap();
        let events = drain(&mut seq);

        assert_eq!(seq.phase(), RevealPhase::Settled);
        let settles: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, RevealEvent::Settle { .. }))
            .collect();
        assert_eq!(settles.len(), 1);
        assert!(matches!(events.last(), Some(RevealEvent::Settle { index: 2, .. })));
    }

    #[test]
    fn run__highlight_walks_round_robin_and_slows_down() {
        let catalog = Catalog::with_defaults();
        let mut seq = RevealSequencer::new(RevealTiming::default());
        let mut rng = StdRng::seed_from_u64(5);

        seq.start(&DrawOutcome::NoReward, &catalog, &mut rng).unwrap();
        let events = drain(&mut seq);
        let highlights: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, RevealEvent::Highlight { .. }))
            .collect();

        // 50ms * 1.08^24 is the first interval past 300ms.
        assert_eq!(highlights.len(), 24);
        for (step, event) in highlights.iter().enumerate() {
            assert_eq!(event.index(), (step + 1) % catalog.len());
        }
        for pair in highlights.windows(2) {
            assert!(pair[1].delay() > pair[0].delay());
        }
        assert_eq!(highlights[0].delay(), Duration::from_millis(50));
    }

    #[test]
    fn run__no_reward_settles_inside_grid() {
        let catalog = Catalog::with_defaults();
        for seed in 0..50 {
            let mut seq = RevealSequencer::new(RevealTiming::default());
            let mut rng = StdRng::seed_from_u64(seed);
            seq.start(&DrawOutcome::NoReward, &catalog, &mut rng).unwrap();
            let events = drain(&mut seq);
            assert_eq!(seq.phase(), RevealPhase::Settled);
            assert!(events.last().is_some_and(|e| e.index() < catalog.len()));
        }
    }

    #[test]
    fn run__is_fused_after_settle() {
        let catalog = Catalog::with_defaults();
        let mut run = RevealRun::new(RevealTiming::default(), catalog.len(), 1);

        let events: Vec<_> = run.by_ref().collect();

        assert_eq!(events.len(), 25);
        assert_eq!(run.next(), None);
        assert!(matches!(events.last(), Some(RevealEvent::Settle { index: 1, .. })));
    }

    #[test]
    fn start__refuses_while_accelerating() {
        let catalog = Catalog::with_defaults();
        let mut seq = RevealSequencer::new(RevealTiming::default());
        let mut rng = StdRng::seed_from_u64(2);
        let first = seq.start(&DrawOutcome::NoReward, &catalog, &mut rng).unwrap();
        seq.next_event();

        let second = seq.start(&DrawOutcome::NoReward, &catalog, &mut rng);

        assert_eq!(second, Err(RevealError::AlreadyRunning));
        assert_eq!(seq.generation(), first);
    }

    #[test]
    fn cancel__invalidates_generation_and_allows_restart() {
        let catalog = Catalog::with_defaults();
        let mut seq = RevealSequencer::new(RevealTiming::default());
        let mut rng = StdRng::seed_from_u64(2);
        let first = seq.start(&DrawOutcome::NoReward, &catalog, &mut rng).unwrap();

        seq.cancel();

        assert_eq!(seq.phase(), RevealPhase::Idle);
        assert_eq!(seq.next_event(), None);
        let second = seq.start(&DrawOutcome::NoReward, &catalog, &mut rng).unwrap();
        assert!(second > first + 1);
    }

    #[test]
    fn start__rejects_timing_that_never_settles() {
        let catalog = Catalog::with_defaults();
        let mut seq = RevealSequencer::new(RevealTiming {
            acceleration: 1.0,
            ..RevealTiming::default()
        });
        let mut rng = StdRng::seed_from_u64(2);

        let result = seq.start(&DrawOutcome::NoReward, &catalog, &mut rng);

        assert_eq!(result, Err(RevealError::InvalidTiming));
        assert_eq!(seq.phase(), RevealPhase::Idle);
    }

    #[test]
    fn start__rejects_item_outside_catalog() {
        let catalog = Catalog::with_defaults();
        let mut stray = catalog.at(0).unwrap().clone();
        stray.id = "fanta-uva".into();
        let mut seq = RevealSequencer::new(RevealTiming::default());
        let mut rng = StdRng::seed_from_u64(2);

        let result = seq.start(&DrawOutcome::Won(stray), &catalog, &mut rng);

        assert_eq!(result, Err(RevealError::UnknownItem("fanta-uva".into())));
    }
}
