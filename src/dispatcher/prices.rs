use anyhow::Result;

use super::AppContext;
use crate::cli::formatters;

pub async fn dispatch_price(fresh: bool, refresh: bool, ctx: &AppContext) -> Result<()> {
    let service = ctx.price_service()?;

    let quote = if refresh {
        tracing::info!("Refreshing cached gold price");
        service.refresh().await?
    } else if fresh {
        service.fresh().await?
    } else {
        service.current().await?
    };

    if ctx.json_output {
        println!("{}", formatters::format_json(&quote));
    } else {
        print!("{}", formatters::format_price(&quote));
    }
    Ok(())
}
