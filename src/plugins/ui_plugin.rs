use bevy::ecs::hierarchy::ChildSpawnerCommands;
use bevy::prelude::*;

use crate::config::tuning::Tuning;
use crate::game::catalog::{Catalog, CatalogItem};
use crate::game::components::*;
use crate::game::events::{HighlightMoved, RevealSettled};
use crate::game::inventory::Inventory;
use crate::game::session::{PlayerSession, SessionOwner};
use crate::plugins::gacha_plugin::RevealDriver;
use crate::plugins::session_plugin::SignOutButton;
use crate::plugins::style::*;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera);
        app.add_systems(Update, button_tint_system);

        // Gacha screen
        app.add_systems(OnEnter(Screen::Gacha), spawn_gacha_screen);
        app.add_systems(OnExit(Screen::Gacha), despawn::<GachaRoot>);
        app.add_systems(
            Update,
            (update_gacha_labels, update_spin_button, highlight_cells)
                .run_if(in_state(Screen::Gacha)),
        );

        // Collection screen
        app.add_systems(OnEnter(Screen::Collection), spawn_collection_screen);
        app.add_systems(OnExit(Screen::Collection), despawn::<CollectionRoot>);
        app.add_systems(Update, refresh_collection.run_if(in_state(Screen::Collection)));

        app.add_systems(
            Update,
            nav_button_system.run_if(in_state(Screen::Gacha).or(in_state(Screen::Collection))),
        );
    }
}

// ── Marker components ───────────────────────────────────────────────

#[derive(Component)]
struct GachaRoot;

#[derive(Component)]
struct CollectionRoot;

#[derive(Component)]
struct PlayerLabel;

#[derive(Component)]
struct ProgressLabel;

/// Collection card for catalog position `.0`.
#[derive(Component)]
struct CollectionCard(usize);

#[derive(Component)]
struct CardTitle(usize);

#[derive(Component)]
struct CardDetail(usize);

#[derive(Component)]
enum NavButton {
    Collection,
    Back,
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn nav_button_system(
    buttons: Query<(&Interaction, &NavButton), Changed<Interaction>>,
    mut next_state: ResMut<NextState<Screen>>,
) {
    for (interaction, button) in &buttons {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match button {
            NavButton::Collection => next_state.set(Screen::Collection),
            NavButton::Back => next_state.set(Screen::Gacha),
        }
    }
}

fn label(parent: &mut ChildSpawnerCommands, text: impl Into<String>, size: f32, color: Color) {
    parent.spawn((
        Text::new(text),
        TextFont { font_size: size, ..default() },
        TextColor(color),
    ));
}

fn player_line(session: Option<&PlayerSession>) -> String {
    match session.map(|s| s.owner()) {
        Some(SessionOwner::Profile { username, .. }) => format!("Playing as {username}"),
        Some(SessionOwner::Offline) => "Playing offline".into(),
        None => String::new(),
    }
}

/// "Empty" or `Name xN` per stack, in catalog order.
pub fn bag_summary(inventory: &Inventory, catalog: &Catalog) -> String {
    let parts: Vec<String> = catalog
        .items()
        .iter()
        .filter_map(|item| {
            let quantity = inventory.quantity_of(&item.id);
            (quantity > 0).then(|| format!("{} x{quantity}", item.name))
        })
        .collect();
    if parts.is_empty() {
        "Empty".into()
    } else {
        parts.join(", ")
    }
}

// ═══════════════════════════════════════════════════════════════════════
// GACHA SCREEN
// ═══════════════════════════════════════════════════════════════════════

fn spawn_gacha_screen(
    mut commands: Commands,
    catalog: Res<Catalog>,
    tuning: Res<Tuning>,
    session: Option<Res<PlayerSession>>,
) {
    commands
        .spawn(screen_root(GachaRoot))
        .with_children(|parent| {
            spawn_title(parent, "Taverna Gacha");

            parent.spawn(Node {
                column_gap: Val::Px(24.0),
                ..default()
            }).with_children(|row| {
                row.spawn((
                    PlayerLabel,
                    Text::new(player_line(session.as_deref())),
                    TextFont { font_size: 18.0, ..default() },
                    TextColor(COLOR_TEXT_DIM),
                ));
                row.spawn((
                    BalanceLabel,
                    Text::new("Coins: --"),
                    TextFont { font_size: 22.0, ..default() },
                    TextColor(COLOR_GOLD),
                ));
            });

            // Reveal grid
            parent.spawn(Node {
                flex_wrap: FlexWrap::Wrap,
                justify_content: JustifyContent::Center,
                column_gap: Val::Px(12.0),
                row_gap: Val::Px(12.0),
                max_width: Val::Px(720.0),
                ..default()
            }).with_children(|grid| {
                for (index, item) in catalog.items().iter().enumerate() {
                    spawn_reveal_cell(grid, index, item);
                }
            });

            parent.spawn((
                SpinButton,
                Button,
                CustomTint,
                Node {
                    min_width: Val::Px(220.0),
                    height: Val::Px(56.0),
                    justify_content: JustifyContent::Center,
                    align_items: AlignItems::Center,
                    border_radius: BorderRadius::all(Val::Px(10.0)),
                    ..default()
                },
                BackgroundColor(COLOR_BTN),
            )).with_children(|btn| {
                label(btn, format!("Spin ({} coins)", tuning.gacha_cost), 22.0, COLOR_TEXT);
            });

            parent.spawn((
                StatusLabel,
                Text::new(""),
                TextFont { font_size: 16.0, ..default() },
                TextColor(COLOR_TEXT_DIM),
            ));
            parent.spawn((
                BagLabel,
                Text::new("Bag: Empty"),
                TextFont { font_size: 16.0, ..default() },
                TextColor(COLOR_TEXT),
            ));

            parent.spawn(Node {
                column_gap: Val::Px(16.0),
                margin: UiRect::top(Val::Px(12.0)),
                ..default()
            }).with_children(|row| {
                spawn_button(row, "Collection", NavButton::Collection);
                spawn_button(row, "Sign out", SignOutButton);
            });
        });
}

fn spawn_reveal_cell(parent: &mut ChildSpawnerCommands, index: usize, item: &CatalogItem) {
    parent.spawn((
        RevealCell(index),
        Node {
            width: Val::Px(160.0),
            height: Val::Px(120.0),
            flex_direction: FlexDirection::Column,
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            row_gap: Val::Px(4.0),
            border_radius: BorderRadius::all(Val::Px(8.0)),
            ..default()
        },
        BackgroundColor(COLOR_CARD),
    )).with_children(|cell| {
        label(cell, item.name.clone(), 16.0, COLOR_TEXT);
        label(cell, item.rarity.label(), 13.0, COLOR_ACCENT);
        label(cell, format!("HP {}  Thirst {}", item.health, item.thirst), 12.0, COLOR_TEXT_DIM);
    });
}

fn update_gacha_labels(
    session: Option<Res<PlayerSession>>,
    catalog: Res<Catalog>,
    mut balance_q: Query<&mut Text, (With<BalanceLabel>, Without<BagLabel>, Without<StatusLabel>)>,
    mut bag_q: Query<&mut Text, (With<BagLabel>, Without<BalanceLabel>, Without<StatusLabel>)>,
    mut status_q: Query<&mut Text, (With<StatusLabel>, Without<BalanceLabel>, Without<BagLabel>)>,
    tuning: Res<Tuning>,
    fresh: Query<(), Added<BalanceLabel>>,
) {
    let Some(session) = session else {
        return;
    };
    if fresh.is_empty() && !session.is_changed() && !tuning.is_changed() {
        return;
    }

    for mut text in &mut balance_q {
        **text = format!("Coins: {}", session.wallet().balance);
    }
    for mut text in &mut bag_q {
        **text = format!("Bag: {}", bag_summary(session.inventory(), &catalog));
    }
    let status = if session.is_spinning() {
        "Spinning...".to_string()
    } else if !session.wallet().can_afford(tuning.gacha_cost) {
        format!("You need {} coins to spin", tuning.gacha_cost)
    } else {
        "Press Spin or Space".to_string()
    };
    for mut text in &mut status_q {
        **text = status.clone();
    }
}

fn update_spin_button(
    session: Option<Res<PlayerSession>>,
    tuning: Res<Tuning>,
    mut buttons: Query<(&Interaction, &mut BackgroundColor), With<SpinButton>>,
) {
    let enabled = session.is_some_and(|s| s.can_spin(tuning.gacha_cost));
    for (interaction, mut bg) in &mut buttons {
        *bg = BackgroundColor(match (enabled, interaction) {
            (false, _) => COLOR_BTN_DISABLED,
            (true, Interaction::Pressed) => COLOR_BTN_PRESS,
            (true, Interaction::Hovered) => COLOR_BTN_HOVER,
            (true, Interaction::None) => COLOR_BTN,
        });
    }
}

fn highlight_cells(
    mut highlights: MessageReader<HighlightMoved>,
    mut settled: MessageReader<RevealSettled>,
    driver: Res<RevealDriver>,
    mut cells: Query<(&RevealCell, &mut BackgroundColor)>,
) {
    if let Some(moved) = highlights
        .read()
        .filter(|m| m.generation == driver.generation())
        .last()
    {
        for (cell, mut bg) in &mut cells {
            *bg = BackgroundColor(if cell.0 == moved.index {
                COLOR_CARD_HIGHLIGHT
            } else {
                COLOR_CARD
            });
        }
    }

    for done in settled.read() {
        let color = if done.outcome.won() {
            COLOR_CARD_WON
        } else {
            COLOR_CARD_HIGHLIGHT
        };
        for (cell, mut bg) in &mut cells {
            if cell.0 == done.index {
                *bg = BackgroundColor(color);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// COLLECTION SCREEN
// ═══════════════════════════════════════════════════════════════════════

struct CardContent {
    title: String,
    detail: String,
    color: Color,
}

fn card_content(item: &CatalogItem, inventory: &Inventory) -> CardContent {
    if !inventory.has_collected(&item.id) {
        return CardContent {
            title: "???".into(),
            detail: "Locked".into(),
            color: COLOR_CARD_LOCKED,
        };
    }
    CardContent {
        title: item.name.clone(),
        detail: format!(
            "{} · x{}\nHP {}  Thirst {}",
            item.rarity.label(),
            inventory.quantity_of(&item.id),
            item.health,
            item.thirst
        ),
        color: COLOR_CARD,
    }
}

fn progress_line(inventory: &Inventory, catalog: &Catalog) -> String {
    let progress = inventory.collection_progress(catalog);
    format!(
        "Collected {} / {} ({:.0}%)",
        progress.collected,
        progress.total,
        progress.percent()
    )
}

fn spawn_collection_screen(
    mut commands: Commands,
    catalog: Res<Catalog>,
    session: Option<Res<PlayerSession>>,
) {
    let inventory = session.as_deref().map(|s| s.inventory().clone()).unwrap_or_default();

    commands
        .spawn(screen_root(CollectionRoot))
        .with_children(|parent| {
            spawn_title(parent, "Collection");
            parent.spawn((
                ProgressLabel,
                Text::new(progress_line(&inventory, &catalog)),
                TextFont { font_size: 20.0, ..default() },
                TextColor(COLOR_GOLD),
            ));

            parent.spawn(Node {
                flex_wrap: FlexWrap::Wrap,
                justify_content: JustifyContent::Center,
                column_gap: Val::Px(12.0),
                row_gap: Val::Px(12.0),
                max_width: Val::Px(720.0),
                ..default()
            }).with_children(|grid| {
                for (index, item) in catalog.items().iter().enumerate() {
                    let content = card_content(item, &inventory);
                    grid.spawn((
                        CollectionCard(index),
                        Node {
                            width: Val::Px(160.0),
                            height: Val::Px(130.0),
                            flex_direction: FlexDirection::Column,
                            justify_content: JustifyContent::Center,
                            align_items: AlignItems::Center,
                            row_gap: Val::Px(6.0),
                            border_radius: BorderRadius::all(Val::Px(8.0)),
                            ..default()
                        },
                        BackgroundColor(content.color),
                    )).with_children(|card| {
                        card.spawn((
                            CardTitle(index),
                            Text::new(content.title),
                            TextFont { font_size: 16.0, ..default() },
                            TextColor(COLOR_TEXT),
                        ));
                        card.spawn((
                            CardDetail(index),
                            Text::new(content.detail),
                            TextFont { font_size: 13.0, ..default() },
                            TextColor(COLOR_TEXT_DIM),
                        ));
                    });
                }
            });

            parent.spawn(Node {
                column_gap: Val::Px(16.0),
                margin: UiRect::top(Val::Px(12.0)),
                ..default()
            }).with_children(|row| {
                spawn_button(row, "Back", NavButton::Back);
                spawn_button(row, "Sign out", SignOutButton);
            });
        });
}

/// A spin can settle while this screen is open.
fn refresh_collection(
    session: Option<Res<PlayerSession>>,
    catalog: Res<Catalog>,
    mut progress_q: Query<&mut Text, (With<ProgressLabel>, Without<CardTitle>, Without<CardDetail>)>,
    mut cards: Query<(&CollectionCard, &mut BackgroundColor)>,
    mut titles: Query<(&CardTitle, &mut Text), (Without<ProgressLabel>, Without<CardDetail>)>,
    mut details: Query<(&CardDetail, &mut Text), (Without<ProgressLabel>, Without<CardTitle>)>,
) {
    let Some(session) = session else {
        return;
    };
    if !session.is_changed() {
        return;
    }
    let inventory = session.inventory();

    for mut text in &mut progress_q {
        **text = progress_line(inventory, &catalog);
    }
    for (card, mut bg) in &mut cards {
        if let Some(item) = catalog.at(card.0) {
            *bg = BackgroundColor(card_content(item, inventory).color);
        }
    }
    for (title, mut text) in &mut titles {
        if let Some(item) = catalog.at(title.0) {
            **text = card_content(item, inventory).title;
        }
    }
    for (detail, mut text) in &mut details {
        if let Some(item) = catalog.at(detail.0) {
            **text = card_content(item, inventory).detail;
        }
    }
}
