use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use goldtrack::db::{self, GoalUpdate, NewGoal};
use goldtrack::reports;
use tracing::info;

use super::{parse_date, parse_decimal, AppContext};
use crate::cli::formatters;
use crate::cli::GoalCommands;

pub async fn dispatch_goals(action: &GoalCommands, ctx: &AppContext) -> Result<()> {
    match action {
        GoalCommands::Add {
            title,
            target,
            deadline,
            description,
        } => {
            let goal = NewGoal::new(
                ctx.user_id,
                title,
                parse_decimal("target", target)?,
                parse_date("deadline", deadline)?,
                description.clone(),
            )?;
            let conn = ctx.open_db()?;
            let goal = db::insert_goal(&conn, &goal, Utc::now())?;
            info!("Added goal {} for user {}", goal.id, ctx.user_id);

            if ctx.json_output {
                println!("{}", formatters::format_json(&goal));
            } else {
                println!(
                    "{} Goal {} added: {} by {}",
                    "✓".green().bold(),
                    goal.id,
                    goal.title.bold(),
                    goal.deadline.format("%Y-%m-%d")
                );
            }
            Ok(())
        }
        GoalCommands::List => {
            let conn = ctx.open_db()?;
            let progress = reports::calculate_goal_progress(&conn, ctx.user_id)?;

            if ctx.json_output {
                println!("{}", formatters::format_json(&progress));
            } else {
                print!("{}", formatters::format_goals_table(&progress));
            }
            Ok(())
        }
        GoalCommands::Update {
            id,
            title,
            target,
            deadline,
            description,
        } => {
            let update = GoalUpdate {
                title: title.clone(),
                description: description.clone(),
                target_weight_grams: target
                    .as_deref()
                    .map(|t| parse_decimal("target", t))
                    .transpose()?,
                deadline: deadline
                    .as_deref()
                    .map(|d| parse_date("deadline", d))
                    .transpose()?,
            };
            let conn = ctx.open_db()?;
            let goal = db::update_goal(&conn, ctx.user_id, *id, &update, Utc::now())?;
            info!("Updated goal {} for user {}", id, ctx.user_id);

            if ctx.json_output {
                println!("{}", formatters::format_json(&goal));
            } else {
                println!("{} Goal {} updated", "✓".green().bold(), goal.id);
            }
            Ok(())
        }
        GoalCommands::Complete { id } => {
            let conn = ctx.open_db()?;
            let goal = db::set_goal_completed(&conn, ctx.user_id, *id, true, Utc::now())?;
            info!("Goal {} marked completed", id);

            if ctx.json_output {
                println!("{}", formatters::format_json(&goal));
            } else {
                println!(
                    "{} Goal {} completed: {}",
                    "✓".green().bold(),
                    goal.id,
                    goal.title
                );
            }
            Ok(())
        }
        GoalCommands::Delete { id } => {
            let conn = ctx.open_db()?;
            db::delete_goal(&conn, ctx.user_id, *id)?;
            info!("Deleted goal {} for user {}", id, ctx.user_id);

            if ctx.json_output {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("{} Goal {} deleted", "✓".green().bold(), id);
            }
            Ok(())
        }
    }
}
