use bevy::prelude::*;

use taverna_gacha::config::tuning::Tuning;
use taverna_gacha::plugins::{
    gacha_plugin::GachaPlugin, session_plugin::SessionPlugin, storage_plugin::StoragePlugin,
    toast_plugin::ToastPlugin, ui_plugin::UiPlugin,
};

fn main() {
    let tuning = Tuning::load_or_default();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Taverna Gacha".into(),
                resolution: (900u32, 1000u32).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(tuning)
        .add_plugins(ToastPlugin)
        .add_plugins(GachaPlugin)
        .add_plugins(StoragePlugin)
        .add_plugins(SessionPlugin)
        .add_plugins(UiPlugin)
        .run();
}
