mod app;
mod dashboard;
pub mod filter_panel;

pub use app::DashboardApp;
pub use dashboard::{DashboardView, ViewBundle};
pub use filter_panel::{FilterPanel, FilterPanelAction};
