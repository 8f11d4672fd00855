use bevy::ecs::hierarchy::ChildSpawnerCommands;
use bevy::prelude::*;

// ── Colors ───────────────────────────────────────────────────────────

pub const COLOR_BG: Color = Color::srgba(0.08, 0.08, 0.12, 1.0);
pub const COLOR_BTN: Color = Color::srgba(0.18, 0.20, 0.28, 1.0);
pub const COLOR_BTN_HOVER: Color = Color::srgba(0.28, 0.32, 0.42, 1.0);
pub const COLOR_BTN_PRESS: Color = Color::srgba(0.12, 0.14, 0.20, 1.0);
pub const COLOR_BTN_DISABLED: Color = Color::srgba(0.14, 0.14, 0.18, 1.0);
pub const COLOR_TEXT: Color = Color::WHITE;
pub const COLOR_TEXT_DIM: Color = Color::srgba(0.5, 0.5, 0.5, 1.0);
pub const COLOR_ACCENT: Color = Color::srgba(1.0, 0.6, 0.1, 1.0);
pub const COLOR_GOLD: Color = Color::srgba(1.0, 0.84, 0.2, 1.0);
pub const COLOR_CARD: Color = Color::srgba(0.12, 0.14, 0.20, 1.0);
pub const COLOR_CARD_HIGHLIGHT: Color = Color::srgba(0.55, 0.35, 0.10, 1.0);
pub const COLOR_CARD_WON: Color = Color::srgba(0.15, 0.55, 0.25, 1.0);
pub const COLOR_CARD_LOCKED: Color = Color::srgba(0.10, 0.10, 0.12, 1.0);
pub const COLOR_INPUT_BG: Color = Color::srgba(0.10, 0.10, 0.16, 1.0);
pub const COLOR_INPUT_FOCUS: Color = Color::srgba(0.15, 0.15, 0.25, 1.0);
pub const COLOR_SUCCESS: Color = Color::srgba(0.12, 0.45, 0.22, 0.95);
pub const COLOR_INFO: Color = Color::srgba(0.15, 0.25, 0.45, 0.95);
pub const COLOR_ERROR: Color = Color::srgba(0.55, 0.12, 0.12, 0.95);

// ── Shared helpers ───────────────────────────────────────────────────

pub fn despawn<T: Component>(mut commands: Commands, query: Query<Entity, With<T>>) {
    for entity in &query {
        commands.entity(entity).despawn();
    }
}

pub fn screen_root<C: Component>(marker: C) -> impl Bundle {
    (
        marker,
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            flex_direction: FlexDirection::Column,
            justify_content: JustifyContent::FlexStart,
            align_items: AlignItems::Center,
            padding: UiRect::all(Val::Px(24.0)),
            row_gap: Val::Px(16.0),
            ..default()
        },
        BackgroundColor(COLOR_BG),
    )
}

pub fn spawn_title(parent: &mut ChildSpawnerCommands, title: &str) {
    parent.spawn((
        Text::new(title),
        TextFont { font_size: 40.0, ..default() },
        TextColor(COLOR_ACCENT),
        Node { margin: UiRect::bottom(Val::Px(8.0)), ..default() },
    ));
}

pub fn spawn_button<C: Component>(parent: &mut ChildSpawnerCommands, label: &str, marker: C) {
    parent.spawn((
        marker,
        Button,
        Node {
            min_width: Val::Px(160.0),
            height: Val::Px(44.0),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            padding: UiRect::horizontal(Val::Px(16.0)),
            border_radius: BorderRadius::all(Val::Px(6.0)),
            ..default()
        },
        BackgroundColor(COLOR_BTN),
    )).with_children(|btn| {
        btn.spawn((
            Text::new(label),
            TextFont { font_size: 18.0, ..default() },
            TextColor(COLOR_TEXT),
        ));
    });
}

/// Hover/press tint for every plain button. Buttons with their own state
/// (e.g. a disabled spin button) carry [`CustomTint`] and are skipped.
pub fn button_tint_system(
    mut buttons: Query<(&Interaction, &mut BackgroundColor), (Changed<Interaction>, With<Button>, Without<CustomTint>)>,
) {
    for (interaction, mut bg) in &mut buttons {
        *bg = BackgroundColor(match interaction {
            Interaction::Pressed => COLOR_BTN_PRESS,
            Interaction::Hovered => COLOR_BTN_HOVER,
            Interaction::None => COLOR_BTN,
        });
    }
}

#[derive(Component)]
pub struct CustomTint;
