//! User interface module - egui shell window and native dialogs

mod app;
mod components;
pub mod dialogs;
mod panels;
mod request;
mod theme;

pub use app::ShellApp;
