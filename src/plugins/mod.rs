pub mod gacha_plugin;
pub mod session_plugin;
pub mod storage_plugin;
pub mod style;
pub mod toast_plugin;
pub mod ui_plugin;
