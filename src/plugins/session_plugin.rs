use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::prelude::*;

use crate::config::tuning::Tuning;
use crate::game::catalog::Catalog;
use crate::game::components::Screen;
use crate::game::events::SessionChanged;
use crate::game::notify::{Toast, ToastKind};
use crate::game::session::{LoginError, PlayerSession, login, open_profile_session};
use crate::plugins::storage_plugin::{TokioRuntime, apply_commit, init_storage};
use crate::plugins::style::*;
use crate::storage::local_state::{LocalStateFile, PlayerStateBlob, RememberedLogin, RememberedLoginFile};
use crate::storage::reconcile::PersistQueue;
use crate::storage::repo::{ProfileRow, ProfileStore, StoreError};
use crate::storage::sqlite_repo::SqliteProfileStore;

// ── Marker components ───────────────────────────────────────────────

#[derive(Component)]
struct LoginRoot;

#[derive(Component, Clone, Copy)]
enum LoginButton {
    LogIn,
    PlayOffline,
}

/// Sign-out button, spawned by the gacha screen.
#[derive(Component)]
pub struct SignOutButton;

// ── Text Input Widget ───────────────────────────────────────────────

#[derive(Component, Default)]
struct TextInput {
    value: String,
    focused: bool,
}

#[derive(Component)]
struct TextInputDisplay;

/// Enter pressed while the username field has focus.
#[derive(Message)]
struct LoginSubmitted;

// ── Plugin ──────────────────────────────────────────────────────────

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<SessionChanged>();
        app.add_message::<LoginSubmitted>();
        app.add_systems(Startup, restore_login.after(init_storage));

        app.add_systems(OnEnter(Screen::Login), spawn_login_screen);
        app.add_systems(OnExit(Screen::Login), despawn::<LoginRoot>);
        app.add_systems(
            Update,
            (text_input_system, login_button_system)
                .chain()
                .run_if(in_state(Screen::Login)),
        );
        app.add_systems(
            Update,
            sign_out_system.run_if(in_state(Screen::Gacha).or(in_state(Screen::Collection))),
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════
// SESSION LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════

/// Open a profile session on the store's runtime and make it current.
fn enter_profile(
    commands: &mut Commands,
    rt: &TokioRuntime,
    store: &SqliteProfileStore,
    queue: Option<&PersistQueue>,
    profile: ProfileRow,
    catalog: &Catalog,
    tuning: &Tuning,
) -> Result<String, StoreError> {
    let (session, misses) = rt.0.block_on(async {
        // Writes left over from the previous session land before the read.
        if let Some(queue) = queue {
            queue.flush().await;
        }
        open_profile_session(store, profile, catalog, tuning.no_reward_percent).await
    })?;
    if !misses.is_empty() {
        warn!("{} stored items are not in the catalog", misses.len());
    }
    let username = session.username().unwrap_or_default().to_string();
    commands.insert_resource(session);
    Ok(username)
}

/// Skip the login screen when the last player never signed out.
fn restore_login(
    mut commands: Commands,
    remembered: Option<Res<RememberedLoginFile>>,
    store: Option<Res<SqliteProfileStore>>,
    rt: Option<Res<TokioRuntime>>,
    queue: Option<Res<PersistQueue>>,
    catalog: Res<Catalog>,
    tuning: Res<Tuning>,
    mut next_state: ResMut<NextState<Screen>>,
) {
    let (Some(remembered), Some(store), Some(rt)) = (remembered, store, rt) else {
        return;
    };
    let Some(login) = remembered.load() else {
        return;
    };

    let profile = match rt.0.block_on(store.find_profile_by_username(&login.username)) {
        Ok(Some(profile)) if profile.id == login.id => profile,
        Ok(_) => {
            warn!("Remembered login '{}' no longer exists", login.username);
            if let Err(e) = remembered.clear() {
                warn!("Failed to clear remembered login: {e}");
            }
            return;
        }
        Err(e) => {
            error!("Failed to restore login: {e}");
            return;
        }
    };

    match enter_profile(&mut commands, &rt, &store, queue.as_deref(), profile, &catalog, &tuning) {
        Ok(username) => {
            info!("Restored session for {username}");
            next_state.set(Screen::Gacha);
        }
        Err(e) => error!("Failed to restore login: {e}"),
    }
}

#[allow(clippy::too_many_arguments)]
fn login_button_system(
    mut commands: Commands,
    buttons: Query<(&Interaction, &LoginButton), Changed<Interaction>>,
    mut submits: MessageReader<LoginSubmitted>,
    inputs: Query<&TextInput>,
    store: Option<Res<SqliteProfileStore>>,
    rt: Option<Res<TokioRuntime>>,
    queue: Option<Res<PersistQueue>>,
    local: Option<Res<LocalStateFile>>,
    remembered: Option<Res<RememberedLoginFile>>,
    catalog: Res<Catalog>,
    tuning: Res<Tuning>,
    mut toasts: MessageWriter<Toast>,
    mut changed: MessageWriter<SessionChanged>,
    mut next_state: ResMut<NextState<Screen>>,
) {
    let pressed = buttons
        .iter()
        .find(|(interaction, _)| **interaction == Interaction::Pressed)
        .map(|(_, button)| *button);
    // Enter in the username field counts as pressing "Log in".
    let submitted = submits.read().count() > 0;
    let Some(action) = pressed.or(submitted.then_some(LoginButton::LogIn)) else {
        return;
    };

    match action {
        LoginButton::LogIn => {
            let (Some(store), Some(rt)) = (store.as_deref(), rt.as_deref()) else {
                toasts.write(Toast::new(ToastKind::Error, "Profile store unavailable"));
                return;
            };
            let username = inputs.iter().next().map(|i| i.value.clone()).unwrap_or_default();

            let profile = match rt.0.block_on(login(store, &username)) {
                Ok(profile) => profile,
                Err(LoginError::UserNotFound) => {
                    info!("Login refused: '{}' not found", username.trim());
                    toasts.write(Toast::user_not_found());
                    return;
                }
                Err(e) => {
                    warn!("Login failed: {e}");
                    toasts.write(Toast::new(ToastKind::Error, e.to_string()));
                    return;
                }
            };
            let remember = RememberedLogin {
                id: profile.id.clone(),
                username: profile.username.clone(),
            };

            match enter_profile(&mut commands, rt, store, queue.as_deref(), profile, &catalog, &tuning) {
                Ok(name) => {
                    if let Some(file) = remembered.as_deref() {
                        if let Err(e) = file.save(&remember) {
                            warn!("Failed to remember login: {e}");
                        }
                    }
                    info!("Logged in as {name}");
                    toasts.write(Toast::welcome(&name));
                    changed.write(SessionChanged);
                    next_state.set(Screen::Gacha);
                }
                Err(e) => {
                    error!("Failed to load profile: {e}");
                    toasts.write(
                        Toast::new(ToastKind::Error, "Could not load profile")
                            .with_description(e.to_string()),
                    );
                }
            }
        }
        LoginButton::PlayOffline => {
            let blob = match local.as_deref() {
                Some(file) => file.load_or_default(tuning.starting_coins),
                None => PlayerStateBlob::fresh(tuning.starting_coins),
            };
            let (session, misses) = PlayerSession::offline(blob, &catalog, tuning.no_reward_percent);
            if !misses.is_empty() {
                warn!("{} saved items are not in the catalog", misses.len());
            }
            info!("Playing offline with {} coins", session.wallet().balance);
            commands.insert_resource(session);
            changed.write(SessionChanged);
            next_state.set(Screen::Gacha);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn sign_out_system(
    mut commands: Commands,
    buttons: Query<&Interaction, (Changed<Interaction>, With<SignOutButton>)>,
    session: Option<ResMut<PlayerSession>>,
    local: Option<Res<LocalStateFile>>,
    queue: Option<Res<PersistQueue>>,
    remembered: Option<Res<RememberedLoginFile>>,
    mut toasts: MessageWriter<Toast>,
    mut changed: MessageWriter<SessionChanged>,
    mut next_state: ResMut<NextState<Screen>>,
) {
    if !buttons.iter().any(|i| *i == Interaction::Pressed) {
        return;
    }

    if let Some(mut session) = session {
        // A paid spin still owes its outcome.
        if let Some((outcome, commit)) = session.settle() {
            info!("Settling in-flight spin on sign out (won: {})", outcome.won());
            apply_commit(commit, local.as_deref(), queue.as_deref(), &mut toasts);
        }
    }
    if let Some(file) = remembered.as_deref() {
        if let Err(e) = file.clear() {
            warn!("Failed to clear remembered login: {e}");
        }
    }

    commands.remove_resource::<PlayerSession>();
    changed.write(SessionChanged);
    next_state.set(Screen::Login);
    info!("Signed out");
}

// ═══════════════════════════════════════════════════════════════════════
// LOGIN SCREEN
// ═══════════════════════════════════════════════════════════════════════

fn spawn_login_screen(mut commands: Commands, store: Option<Res<SqliteProfileStore>>) {
    commands
        .spawn(screen_root(LoginRoot))
        .with_children(|parent| {
            spawn_title(parent, "Taverna Gacha");
            parent.spawn((
                Text::new("Username"),
                TextFont { font_size: 18.0, ..default() },
                TextColor(COLOR_TEXT_DIM),
            ));
            parent.spawn((
                TextInput::default(),
                Button,
                CustomTint,
                Node {
                    width: Val::Px(280.0),
                    height: Val::Px(40.0),
                    justify_content: JustifyContent::FlexStart,
                    align_items: AlignItems::Center,
                    padding: UiRect::horizontal(Val::Px(10.0)),
                    border_radius: BorderRadius::all(Val::Px(4.0)),
                    ..default()
                },
                BackgroundColor(COLOR_INPUT_BG),
            )).with_children(|input| {
                input.spawn((
                    TextInputDisplay,
                    Text::new("..."),
                    TextFont { font_size: 18.0, ..default() },
                    TextColor(COLOR_TEXT),
                ));
            });

            if store.is_some() {
                spawn_button(parent, "Log in", LoginButton::LogIn);
            } else {
                parent.spawn((
                    Text::new("Profile store unavailable"),
                    TextFont { font_size: 16.0, ..default() },
                    TextColor(COLOR_TEXT_DIM),
                ));
            }
            spawn_button(parent, "Play offline", LoginButton::PlayOffline);
        });
}

/// What one key press did to the username field.
#[derive(Debug, PartialEq, Eq)]
enum FieldEdit {
    Changed,
    Submit,
    Blur,
    Ignored,
}

fn edit_field(value: &mut String, key: &Key) -> FieldEdit {
    match key {
        Key::Backspace => {
            value.pop();
            FieldEdit::Changed
        }
        Key::Enter => FieldEdit::Submit,
        Key::Escape => FieldEdit::Blur,
        // Usernames never contain whitespace.
        Key::Character(c) if !c.chars().any(char::is_whitespace) => {
            value.push_str(c.as_str());
            FieldEdit::Changed
        }
        _ => FieldEdit::Ignored,
    }
}

fn text_input_system(
    mut inputs: Query<(&Interaction, &mut TextInput, &mut BackgroundColor, &Children)>,
    mut displays: Query<&mut Text, With<TextInputDisplay>>,
    mut keyboard_events: MessageReader<KeyboardInput>,
    mut submits: MessageWriter<LoginSubmitted>,
) {
    let keys: Vec<Key> = keyboard_events
        .read()
        .filter(|event| event.state.is_pressed())
        .map(|event| event.logical_key.clone())
        .collect();

    for (interaction, mut input, mut bg, children) in &mut inputs {
        if *interaction == Interaction::Pressed {
            input.focused = true;
        }
        if !input.focused {
            *bg = BackgroundColor(COLOR_INPUT_BG);
            continue;
        }

        let mut changed = false;
        for key in &keys {
            match edit_field(&mut input.value, key) {
                FieldEdit::Changed => changed = true,
                FieldEdit::Submit => {
                    submits.write(LoginSubmitted);
                }
                FieldEdit::Blur => input.focused = false,
                FieldEdit::Ignored => {}
            }
        }
        *bg = BackgroundColor(if input.focused { COLOR_INPUT_FOCUS } else { COLOR_INPUT_BG });

        if !changed {
            continue;
        }
        let shown = if input.value.is_empty() { "...".to_string() } else { input.value.clone() };
        for child in children.iter() {
            if let Ok(mut text) = displays.get_mut(child) {
                **text = shown.clone();
            }
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    fn typed(keys: &[Key]) -> (String, Vec<FieldEdit>) {
        let mut value = String::new();
        let edits = keys.iter().map(|key| edit_field(&mut value, key)).collect();
        (value, edits)
    }

    #[test]
    fn edit_field__enter_submits_what_was_typed() {
        let (value, edits) = typed(&[
            Key::Character("w".into()),
            Key::Character("o".into()),
            Key::Enter,
        ]);

        assert_eq!(value, "wo");
        assert_eq!(edits.last(), Some(&FieldEdit::Submit));
    }

    #[test]
    fn edit_field__backspace_and_escape() {
        let (value, edits) = typed(&[
            Key::Character("a".into()),
            Key::Character("b".into()),
            Key::Backspace,
            Key::Escape,
        ]);

        assert_eq!(value, "a");
        assert_eq!(edits.last(), Some(&FieldEdit::Blur));
    }

    #[test]
    fn edit_field__ignores_whitespace_and_other_keys() {
        let (value, edits) = typed(&[Key::Character(" ".into()), Key::Space, Key::Tab]);

        assert!(value.is_empty());
        assert!(edits.iter().all(|e| *e == FieldEdit::Ignored));
    }
}
