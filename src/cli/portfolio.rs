use super::ui;
use crate::models::NewPosition;
use crate::{App, PortfolioCommand, analytics};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::Cell;

pub async fn run(app: &App, command: PortfolioCommand) -> Result<()> {
    match command {
        PortfolioCommand::Show => show(app).await,
        PortfolioCommand::Add {
            symbol,
            quantity,
            price,
            date,
        } => add(app, symbol, quantity, price, date).await,
        PortfolioCommand::Remove { id } => {
            app.portfolio.remove(id).await.context("Remove failed")?;
            println!("Position {id} removed");
            Ok(())
        }
    }
}

async fn show(app: &App) -> Result<()> {
    let currency = app.display_currency();
    let snapshot = app.portfolio.positions().await;
    if let Some(err) = &snapshot.error {
        eprintln!(
            "{}",
            ui::style_text(&format!("Portfolio fetch failed: {err}"), ui::StyleType::Error)
        );
    }
    let positions = snapshot.value.unwrap_or_default();
    if positions.is_empty() {
        println!("Portfolio is empty.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Qty"),
        ui::header_cell("Buy Price"),
        ui::header_cell("Buy Date"),
        ui::header_cell("Price"),
        ui::header_cell("Value"),
        ui::header_cell("P/L"),
        ui::header_cell("P/L %"),
    ]);
    for position in &positions {
        table.add_row(vec![
            Cell::new(&position.stock_symbol),
            Cell::new(format!("{:.2}", position.quantity)),
            Cell::new(format!("{:.2}", position.purchase_price)),
            Cell::new(position.purchase_date.to_string()),
            ui::format_optional_cell(position.current_price, |p| format!("{p:.2}")),
            Cell::new(format!("{:.2}", position.current_value())),
            Cell::new(format!("{:+.2}", position.profit_loss())),
            ui::change_cell(position.profit_loss_percent()),
        ]);
    }
    println!("{table}");

    let totals = analytics::portfolio_totals(&positions);
    let total_value = app
        .converter
        .convert_resolved(totals.total_value, "USD", &currency)
        .await;
    println!(
        "\nTotal Value ({}): {}   P/L: {:+.2} ({:+.2}%)",
        ui::style_text(&currency, ui::StyleType::TotalLabel),
        ui::style_text(&format!("{total_value:.2}"), ui::StyleType::TotalValue),
        totals.total_pl,
        totals.total_pl_percent
    );
    Ok(())
}

async fn add(
    app: &App,
    symbol: String,
    quantity: f64,
    price: f64,
    date: NaiveDate,
) -> Result<()> {
    let currency = app.display_currency();
    let cost = quantity * price;
    let converted_cost = app.converter.convert_resolved(cost, "USD", &currency).await;
    println!(
        "Adding {quantity:.2} x {symbol} @ {price:.2} = {}",
        ui::money(converted_cost, &currency)
    );

    let position = NewPosition {
        stock_symbol: symbol.to_uppercase(),
        quantity,
        purchase_price: price,
        purchase_date: date,
    };
    let created = app.portfolio.add(position).await.context("Add failed")?;
    println!("Added {} (id {})", created.stock_symbol, created.id);
    Ok(())
}
