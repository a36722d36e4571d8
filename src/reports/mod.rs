// Reports module - holdings, goal progress and dashboard views

pub mod dashboard;
pub mod goals;
pub mod holdings;

pub use dashboard::{aggregate, build_dashboard, Dashboard};
pub use goals::{calculate_goal_progress, evaluate_goals, progress_percentage, GoalProgress};
pub use holdings::{calculate_holdings, compute_holdings, HoldingsSummary};
