use super::ui;
use crate::App;
use anyhow::{Result, bail};
use comfy_table::Cell;

pub async fn search(app: &App, query: &str) -> Result<()> {
    let results = app.api.search_stocks(query).await?;
    if results.is_empty() {
        println!("No matches for \"{query}\"");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Exchange"),
    ]);
    for result in &results {
        table.add_row(vec![
            Cell::new(&result.symbol),
            Cell::new(&result.name),
            Cell::new(result.exchange.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn show_quote(app: &App, symbol: &str) -> Result<()> {
    let symbol = symbol.to_uppercase();
    let currency = app.display_currency();
    let snapshot = app.quotes.quote(&symbol).await;

    let Some(quote) = snapshot.value else {
        match snapshot.error {
            Some(err) => bail!("Quote fetch failed: {err}"),
            None => bail!("No quote available for {symbol}"),
        }
    };

    let converted = app
        .converter
        .convert_resolved(quote.current_price, &quote.currency, &currency)
        .await;

    println!(
        "{}  {}",
        ui::style_text(&quote.symbol, ui::StyleType::Title),
        ui::style_text(&quote.name, ui::StyleType::Subtle)
    );
    println!(
        "  Price: {}  ({:+.2}, {:+.2}%)",
        ui::money(converted, &currency),
        quote.change,
        quote.change_percent
    );
    if let Some(volume) = quote.volume {
        println!("  Volume: {volume}");
    }
    if let Some(market_cap) = quote.market_cap {
        println!("  Market cap: {market_cap:.0}");
    }
    if let Some(sector) = &quote.sector {
        println!("  Sector: {sector}");
    }

    match app.api.stock_news(&symbol, 5).await {
        Ok(news) if !news.is_empty() => {
            println!("\n{}", ui::style_text("Recent News", ui::StyleType::Title));
            for item in news {
                println!(
                    "  {} {}",
                    ui::style_text(&item.datetime.format("%Y-%m-%d").to_string(), ui::StyleType::Subtle),
                    item.headline
                );
            }
        }
        Ok(_) => {}
        Err(err) => {
            // News is auxiliary; the quote itself already printed.
            eprintln!(
                "{}",
                ui::style_text(&format!("News unavailable: {err}"), ui::StyleType::Subtle)
            );
        }
    }
    Ok(())
}

pub async fn show_predictions(app: &App, symbol: &str, days: u32) -> Result<()> {
    let symbol = symbol.to_uppercase();
    let predictions = app.api.predictions(&symbol, days).await?;
    if predictions.is_empty() {
        println!("No predictions available for {symbol}");
        return Ok(());
    }

    println!(
        "{}",
        ui::style_text(&format!("{symbol} forecast, next {days} days"), ui::StyleType::Title)
    );
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Predicted"),
        ui::header_cell("Low"),
        ui::header_cell("High"),
    ]);
    for prediction in &predictions {
        table.add_row(vec![
            Cell::new(&prediction.date),
            Cell::new(format!("{:.2}", prediction.predicted_price)),
            Cell::new(format!("{:.2}", prediction.lower_bound)),
            Cell::new(format!("{:.2}", prediction.upper_bound)),
        ]);
    }
    println!("{table}");
    Ok(())
}
