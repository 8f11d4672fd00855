use bevy::prelude::*;
use std::time::Duration;

use crate::config::tuning::Tuning;
use crate::game::notify::{Toast, ToastKind};
use crate::plugins::style::*;

/// Most toasts visible at once; older ones are dropped first.
const MAX_TOASTS: usize = 4;

#[derive(Component)]
struct ToastStack;

#[derive(Component)]
struct ToastEntry {
    lifetime: Timer,
    /// Spawn order, for dropping the oldest.
    serial: u64,
}

#[derive(Resource, Default)]
struct ToastSerial(u64);

pub struct ToastPlugin;

impl Plugin for ToastPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<Toast>();
        app.init_resource::<ToastSerial>();
        app.add_systems(Startup, spawn_toast_stack);
        app.add_systems(Update, (show_toasts, expire_toasts).chain());
    }
}

fn spawn_toast_stack(mut commands: Commands) {
    commands.spawn((
        ToastStack,
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(16.0),
            bottom: Val::Px(16.0),
            flex_direction: FlexDirection::ColumnReverse,
            row_gap: Val::Px(8.0),
            width: Val::Px(340.0),
            ..default()
        },
        GlobalZIndex(10),
    ));
}

fn show_toasts(
    mut commands: Commands,
    mut toasts: MessageReader<Toast>,
    stack: Query<Entity, With<ToastStack>>,
    existing: Query<(Entity, &ToastEntry)>,
    tuning: Res<Tuning>,
    mut serial: ResMut<ToastSerial>,
) {
    let Ok(stack) = stack.single() else {
        return;
    };
    let incoming: Vec<Toast> = toasts.read().cloned().collect();
    if incoming.is_empty() {
        return;
    }

    let mut live: Vec<(Entity, u64)> = existing.iter().map(|(e, t)| (e, t.serial)).collect();
    live.sort_by_key(|(_, s)| *s);
    let overflow = (live.len() + incoming.len()).saturating_sub(MAX_TOASTS);
    for (entity, _) in live.iter().take(overflow) {
        commands.entity(*entity).despawn();
    }

    let lifetime = Duration::from_secs_f32(tuning.toast_secs.max(0.5));
    for toast in incoming {
        match toast.kind {
            ToastKind::Error => warn!("Toast: {}", toast.title),
            _ => info!("Toast: {}", toast.title),
        }
        serial.0 += 1;
        let color = match toast.kind {
            ToastKind::Success => COLOR_SUCCESS,
            ToastKind::Info => COLOR_INFO,
            ToastKind::Error => COLOR_ERROR,
        };

        commands.entity(stack).with_children(|parent| {
            parent.spawn((
                ToastEntry {
                    lifetime: Timer::new(lifetime, TimerMode::Once),
                    serial: serial.0,
                },
                Node {
                    flex_direction: FlexDirection::Column,
                    padding: UiRect::all(Val::Px(12.0)),
                    row_gap: Val::Px(4.0),
                    border_radius: BorderRadius::all(Val::Px(8.0)),
                    ..default()
                },
                BackgroundColor(color),
            )).with_children(|body| {
                body.spawn((
                    Text::new(toast.title.clone()),
                    TextFont { font_size: 18.0, ..default() },
                    TextColor(COLOR_TEXT),
                ));
                if let Some(description) = &toast.description {
                    body.spawn((
                        Text::new(description.clone()),
                        TextFont { font_size: 14.0, ..default() },
                        TextColor(COLOR_TEXT),
                    ));
                }
            });
        });
    }
}

fn expire_toasts(
    mut commands: Commands,
    time: Res<Time>,
    mut entries: Query<(Entity, &mut ToastEntry)>,
) {
    for (entity, mut entry) in &mut entries {
        entry.lifetime.tick(time.delta());
        if entry.lifetime.just_finished() {
            commands.entity(entity).despawn();
        }
    }
}
