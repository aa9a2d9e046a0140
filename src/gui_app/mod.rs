pub mod iced_ui;
pub mod overlay;

pub use iced_ui::run_iced_app;
