pub mod catalog;
pub mod components;
pub mod draw;
pub mod events;
pub mod inventory;
pub mod notify;
pub mod reveal;
pub mod session;
