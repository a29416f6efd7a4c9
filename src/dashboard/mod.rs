//! Dashboard refresh coordination

pub mod refresh;
pub mod state;

pub use refresh::{DashboardRefresher, PanelResult, PanelStatus, RefreshReport, RefreshSnapshot};
pub use state::DashboardState;
