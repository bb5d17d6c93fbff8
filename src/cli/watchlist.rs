use super::ui;
use crate::{App, WatchlistCommand};
use anyhow::{Context, Result};
use comfy_table::Cell;

pub async fn run(app: &App, command: WatchlistCommand) -> Result<()> {
    match command {
        WatchlistCommand::Show => show(app).await,
        WatchlistCommand::Add { symbol, notes } => {
            let entry = app
                .watchlist
                .add(&symbol.to_uppercase(), notes.as_deref())
                .await
                .context("Add failed")?;
            println!("Watching {} (id {})", entry.stock_symbol, entry.id);
            Ok(())
        }
        WatchlistCommand::Remove { id } => {
            app.watchlist.remove(id).await.context("Remove failed")?;
            println!("Watchlist entry {id} removed");
            Ok(())
        }
    }
}

async fn show(app: &App) -> Result<()> {
    let snapshot = app.watchlist.entries().await;
    if let Some(err) = &snapshot.error {
        eprintln!(
            "{}",
            ui::style_text(&format!("Watchlist fetch failed: {err}"), ui::StyleType::Error)
        );
    }
    let entries = snapshot.value.unwrap_or_default();
    if entries.is_empty() {
        println!("Watchlist is empty.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Symbol"),
        ui::header_cell("Price"),
        ui::header_cell("Change"),
        ui::header_cell("Notes"),
    ]);
    for entry in &entries {
        let change = entry
            .change_percent
            .map_or_else(|| Cell::new("N/A"), ui::change_cell);
        table.add_row(vec![
            Cell::new(entry.id.to_string()),
            Cell::new(&entry.stock_symbol),
            ui::format_optional_cell(entry.current_price, |p| format!("{p:.2}")),
            change,
            Cell::new(entry.notes.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
    Ok(())
}
