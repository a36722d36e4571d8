use anyhow::Result;
use goldtrack::reports;

use super::AppContext;
use crate::cli::formatters;

pub async fn dispatch_dashboard(ctx: &AppContext) -> Result<()> {
    let prices = ctx.price_service()?;
    let mut conn = ctx.open_db()?;
    let dashboard = reports::aggregate(&mut conn, &prices, ctx.user_id, ctx.today()).await?;

    if ctx.json_output {
        println!("{}", formatters::format_json(&dashboard));
    } else {
        print!("{}", formatters::format_dashboard(&dashboard));
    }
    Ok(())
}
