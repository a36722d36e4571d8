use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::Goal;
use crate::utils::round_money;

const FULL: Decimal = Decimal::ONE_HUNDRED;

/// Progress of one goal against current holdings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub id: i64,
    pub title: String,
    pub target_weight_grams: Decimal,
    pub progress_percentage: Decimal,
    pub deadline: NaiveDate,
    pub is_completed: bool,
}

/// Percentage of `target` covered by `holdings`, rounded to 2 dp and kept in [0, 100].
/// A non-positive target yields 0.
pub fn progress_percentage(holdings: Decimal, target: Decimal) -> Decimal {
    if target <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    holdings
        .checked_div(target)
        .and_then(|ratio| ratio.checked_mul(FULL))
        .map(round_money)
        .unwrap_or(FULL)
        .clamp(Decimal::ZERO, FULL)
}

/// Evaluate every goal against the same holdings, keeping input order.
/// Completion is passed through as stored; nothing is auto-completed here.
pub fn evaluate_goals(goals: &[Goal], current_holdings: Decimal) -> Vec<GoalProgress> {
    goals
        .iter()
        .map(|goal| GoalProgress {
            id: goal.id,
            title: goal.title.clone(),
            target_weight_grams: goal.target_weight_grams,
            progress_percentage: progress_percentage(current_holdings, goal.target_weight_grams),
            deadline: goal.deadline,
            is_completed: goal.is_completed,
        })
        .collect()
}

/// Goal progress of a user straight from the store
pub fn calculate_goal_progress(conn: &Connection, user_id: i64) -> Result<Vec<GoalProgress>> {
    let transactions = crate::db::list_transactions(conn, user_id)?;
    let goals = crate::db::list_goals(conn, user_id)?;
    let holdings = super::compute_holdings(&transactions)?;
    Ok(evaluate_goals(&goals, holdings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn goal(id: i64, target: Decimal, is_completed: bool) -> Goal {
        let now = Utc::now();
        Goal {
            id,
            user_id: 1,
            title: format!("goal {}", id),
            description: None,
            target_weight_grams: target,
            deadline: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            is_completed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_progress_rounds_to_two_places() {
        assert_eq!(progress_percentage(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(progress_percentage(dec!(2), dec!(3)), dec!(66.67));
        assert_eq!(progress_percentage(dec!(50), dec!(200)), dec!(25));
    }

    #[test]
    fn test_progress_caps_at_hundred() {
        assert_eq!(progress_percentage(dec!(250), dec!(100)), dec!(100));
        assert_eq!(progress_percentage(dec!(100), dec!(100)), dec!(100));
    }

    #[test]
    fn test_zero_or_negative_target_is_zero_percent() {
        assert_eq!(progress_percentage(dec!(50), dec!(0)), Decimal::ZERO);
        assert_eq!(progress_percentage(dec!(50), dec!(-10)), Decimal::ZERO);
    }

    #[test]
    fn test_progress_never_negative() {
        assert_eq!(progress_percentage(dec!(-5), dec!(10)), Decimal::ZERO);
        assert_eq!(progress_percentage(Decimal::ZERO, dec!(10)), Decimal::ZERO);
    }

    #[test]
    fn test_evaluate_goals_keeps_order_and_completion_flag() {
        let goals = vec![
            goal(3, dec!(200), false),
            goal(1, dec!(0), false),
            goal(2, dec!(40), true),
        ];
        let progress = evaluate_goals(&goals, dec!(50));

        let ids: Vec<i64> = progress.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(progress[0].progress_percentage, dec!(25));
        assert_eq!(progress[1].progress_percentage, Decimal::ZERO);
        assert_eq!(progress[2].progress_percentage, dec!(100));
        assert!(progress[2].is_completed);
        assert!(!progress[0].is_completed);
    }
}
