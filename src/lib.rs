// Library entry so integration tests can reach the gacha core.
// The binary (`main.rs`) wires the same modules into a Bevy app.
pub mod config;
pub mod game;
pub mod plugins;
pub mod storage;
