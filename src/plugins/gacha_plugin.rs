use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

use crate::config::tuning::Tuning;
use crate::game::catalog::Catalog;
use crate::game::components::{Screen, SpinButton};
use crate::game::draw::{DrawError, DrawOutcome};
use crate::game::events::{HighlightMoved, RevealSettled, SessionChanged, SpinRequested};
use crate::game::notify::Toast;
use crate::game::reveal::{RevealError, RevealEvent, RevealSequencer};
use crate::game::session::PlayerSession;
use crate::plugins::storage_plugin::apply_commit;
use crate::storage::local_state::LocalStateFile;
use crate::storage::reconcile::PersistQueue;

/// Randomness for draws, toasts and cosmetic settle slots.
#[derive(Resource)]
pub struct GachaRng(pub StdRng);

/// Timer-driven playback of the reveal, plus the pause before the outcome lands.
#[derive(Resource, Default)]
pub struct RevealDriver {
    sequencer: RevealSequencer,
    next: Option<RevealEvent>,
    step_timer: Timer,
    outcome: Option<DrawOutcome>,
    settle_timer: Option<Timer>,
}

impl RevealDriver {
    pub fn new(sequencer: RevealSequencer) -> Self {
        Self {
            sequencer,
            ..default()
        }
    }

    pub fn generation(&self) -> u64 {
        self.sequencer.generation()
    }

    pub fn is_active(&self) -> bool {
        self.next.is_some() || self.settle_timer.is_some()
    }

    pub fn begin(&mut self, outcome: DrawOutcome, catalog: &Catalog, rng: &mut StdRng) -> Result<u64, RevealError> {
        let generation = self.sequencer.start(&outcome, catalog, rng)?;
        self.outcome = Some(outcome);
        self.settle_timer = None;
        self.schedule_next();
        Ok(generation)
    }

    fn schedule_next(&mut self) {
        self.next = self.sequencer.next_event();
        if let Some(event) = self.next {
            self.step_timer = Timer::new(event.delay(), TimerMode::Once);
        }
    }

    /// Advance by `delta` and return the step that became due, if any.
    pub fn advance(&mut self, delta: Duration) -> Option<RevealEvent> {
        let due = self.next?;
        self.step_timer.tick(delta);
        if !self.step_timer.just_finished() {
            return None;
        }
        self.schedule_next();
        Some(due)
    }

    pub fn start_settle_delay(&mut self, delay: Duration) {
        self.settle_timer = Some(Timer::new(delay, TimerMode::Once));
    }

    /// Hands back the outcome once the settle pause is over, exactly once.
    pub fn tick_settle(&mut self, delta: Duration) -> Option<DrawOutcome> {
        let timer = self.settle_timer.as_mut()?;
        timer.tick(delta);
        if !timer.just_finished() {
            return None;
        }
        self.settle_timer = None;
        self.outcome.take()
    }

    pub fn cancel(&mut self) {
        self.sequencer.cancel();
        self.next = None;
        self.settle_timer = None;
        self.outcome = None;
    }
}

pub struct GachaPlugin;

impl Plugin for GachaPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SpinRequested>();
        app.add_message::<HighlightMoved>();
        app.add_message::<RevealSettled>();
        app.init_state::<Screen>();
        app.insert_resource(Catalog::with_defaults());
        app.insert_resource(GachaRng(StdRng::from_os_rng()));
        app.add_systems(Startup, setup_reveal_driver);

        app.add_systems(
            Update,
            (spin_input_system, handle_spin_requests)
                .chain()
                .run_if(in_state(Screen::Gacha)),
        );
        // Keeps running on the collection screen so a spin never stalls.
        app.add_systems(
            Update,
            (tick_reveal, finish_settle)
                .chain()
                .after(handle_spin_requests)
                .run_if(in_state(Screen::Gacha).or(in_state(Screen::Collection))),
        );
        app.add_systems(Update, (cancel_on_session_change, sync_reveal_timing, tuning_reload_input));
    }
}

fn setup_reveal_driver(mut commands: Commands, tuning: Res<Tuning>) {
    commands.insert_resource(RevealDriver::new(RevealSequencer::new(tuning.reveal_timing())));
}

fn spin_input_system(
    buttons: Query<&Interaction, (Changed<Interaction>, With<SpinButton>)>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut requests: MessageWriter<SpinRequested>,
) {
    let clicked = buttons.iter().any(|i| *i == Interaction::Pressed);
    if clicked || keyboard.just_pressed(KeyCode::Space) {
        requests.write(SpinRequested);
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_spin_requests(
    mut requests: MessageReader<SpinRequested>,
    session: Option<ResMut<PlayerSession>>,
    catalog: Res<Catalog>,
    tuning: Res<Tuning>,
    mut rng: ResMut<GachaRng>,
    mut driver: ResMut<RevealDriver>,
    local: Option<Res<LocalStateFile>>,
    queue: Option<Res<PersistQueue>>,
    mut toasts: MessageWriter<Toast>,
) {
    // One spin per frame at most; extra clicks are dropped.
    if requests.read().count() == 0 {
        return;
    }
    let Some(mut session) = session else {
        return;
    };

    match session.spin(tuning.gacha_cost, &catalog, &mut rng.0) {
        Ok((outcome, commit)) => {
            info!(
                "Spin paid, balance now {} (won: {})",
                session.wallet().balance,
                outcome.won()
            );
            apply_commit(commit, local.as_deref(), queue.as_deref(), &mut toasts);

            if let Err(e) = driver.begin(outcome, &catalog, &mut rng.0) {
                // No animation possible; pay out straight away.
                warn!("Reveal could not start: {e}");
                if let Some((outcome, commit)) = session.settle() {
                    apply_commit(commit, local.as_deref(), queue.as_deref(), &mut toasts);
                    toasts.write(outcome_toast(&outcome, &mut rng.0));
                }
            }
        }
        Err(DrawError::InsufficientFunds { balance, cost }) => {
            info!("Spin refused: balance {balance} < cost {cost}");
            toasts.write(Toast::insufficient_funds(cost));
        }
        Err(DrawError::SpinInProgress) => {
            debug!("Spin ignored, reveal still running");
        }
        Err(DrawError::EmptyCatalog) => {
            warn!("Spin refused: catalog is empty");
        }
    }
}

fn tick_reveal(
    time: Res<Time>,
    tuning: Res<Tuning>,
    mut driver: ResMut<RevealDriver>,
    mut highlights: MessageWriter<HighlightMoved>,
    mut settled: MessageWriter<RevealSettled>,
) {
    let Some(event) = driver.advance(time.delta()) else {
        return;
    };
    let generation = driver.generation();
    highlights.write(HighlightMoved {
        index: event.index(),
        generation,
    });
    if let RevealEvent::Settle { index, .. } = event {
        if let Some(outcome) = driver.outcome.clone() {
            settled.write(RevealSettled { index, outcome });
        }
        driver.start_settle_delay(tuning.settle_delay());
    }
}

fn finish_settle(
    time: Res<Time>,
    mut driver: ResMut<RevealDriver>,
    session: Option<ResMut<PlayerSession>>,
    mut rng: ResMut<GachaRng>,
    local: Option<Res<LocalStateFile>>,
    queue: Option<Res<PersistQueue>>,
    mut toasts: MessageWriter<Toast>,
) {
    if driver.tick_settle(time.delta()).is_none() {
        return;
    }
    let Some(mut session) = session else {
        return;
    };
    let Some((outcome, commit)) = session.settle() else {
        return;
    };
    apply_commit(commit, local.as_deref(), queue.as_deref(), &mut toasts);
    toasts.write(outcome_toast(&outcome, &mut rng.0));
}

fn outcome_toast(outcome: &DrawOutcome, rng: &mut StdRng) -> Toast {
    match outcome.item() {
        Some(item) => Toast::won(item, rng),
        None => Toast::lost(),
    }
}

fn cancel_on_session_change(mut changes: MessageReader<SessionChanged>, mut driver: ResMut<RevealDriver>) {
    if changes.read().count() > 0 && driver.is_active() {
        info!("Session changed, dropping running reveal");
        driver.cancel();
    }
}

fn sync_reveal_timing(tuning: Res<Tuning>, mut driver: ResMut<RevealDriver>) {
    if tuning.is_changed() {
        driver.sequencer.set_timing(tuning.reveal_timing());
    }
}

/// Reload tuning with F5.
fn tuning_reload_input(keyboard: Res<ButtonInput<KeyCode>>, mut tuning: ResMut<Tuning>) {
    if keyboard.just_pressed(KeyCode::F5) {
        tuning.reload();
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::game::reveal::RevealTiming;

    #[test]
    fn driver__plays_steps_then_hands_outcome_back_once() {
        let catalog = Catalog::with_defaults();
        let item = catalog.at(3).unwrap().clone();
        let mut driver = RevealDriver::new(RevealSequencer::new(RevealTiming::default()));
        let mut rng = StdRng::seed_from_u64(4);
        driver.begin(DrawOutcome::Won(item.clone()), &catalog, &mut rng).unwrap();

        let mut steps = Vec::new();
        while driver.next.is_some() {
            if let Some(event) = driver.advance(Duration::from_millis(10)) {
                steps.push(event);
            }
        }
        driver.start_settle_delay(Duration::from_millis(500));

        assert!(matches!(steps.last(), Some(RevealEvent::Settle { index: 3, .. })));
        assert_eq!(driver.tick_settle(Duration::from_millis(499)), None);
        assert_eq!(driver.tick_settle(Duration::from_millis(1)), Some(DrawOutcome::Won(item)));
        assert_eq!(driver.tick_settle(Duration::from_millis(500)), None);
        assert!(!driver.is_active());
    }

    #[test]
    fn driver__cancel_stops_everything() {
        let catalog = Catalog::with_defaults();
        let mut driver = RevealDriver::new(RevealSequencer::new(RevealTiming::default()));
        let mut rng = StdRng::seed_from_u64(4);
        let generation = driver.begin(DrawOutcome::NoReward, &catalog, &mut rng).unwrap();

        driver.cancel();

        assert!(!driver.is_active());
        assert!(driver.generation() > generation);
        assert_eq!(driver.advance(Duration::from_secs(1)), None);
    }
}
