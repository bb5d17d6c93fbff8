use super::ui;
use crate::App;
use crate::dashboard::{self, DashboardData, MarketMovers};
use crate::models::Quote;
use anyhow::Result;
use comfy_table::Cell;

pub async fn run(app: &App) -> Result<()> {
    let currency = app.display_currency();

    let positions = if app.session.is_authenticated() {
        app.portfolio.positions().await.value
    } else {
        None
    };

    let pb = ui::new_spinner("Fetching market data...");

    let data = dashboard::build_dashboard(
        &app.quotes,
        &app.config.indices,
        &app.config.popular_symbols,
        positions.as_deref(),
    )
    .await;
    pb.finish_and_clear();

    print_indices(&data);
    print_movers("US Markets", &data.us);
    print_movers("Indian Markets", &data.india);

    if let Some(totals) = data.portfolio_totals {
        let value = app
            .converter
            .convert_resolved(totals.total_value, "USD", &currency)
            .await;
        let pl = app
            .converter
            .convert_resolved(totals.total_pl, "USD", &currency)
            .await;
        println!(
            "\n{}",
            ui::style_text("Portfolio", ui::StyleType::Title)
        );
        println!(
            "  Value: {}   P/L: {} ({:+.2}%)",
            ui::style_text(&ui::money(value, &currency), ui::StyleType::TotalValue),
            ui::money(pl, &currency),
            totals.total_pl_percent
        );
    }

    Ok(())
}

fn print_indices(data: &DashboardData) {
    println!("{}", ui::style_text("Market Indices", ui::StyleType::Title));
    for group in &data.index_groups {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell(&format!("Index ({})", group.country)),
            ui::header_cell("Price"),
            ui::header_cell("Change"),
        ]);
        for index in &group.indices {
            table.add_row(vec![
                Cell::new(&index.name),
                Cell::new(format!("{:.2}", index.quote.current_price)),
                ui::change_cell(index.quote.change_percent),
            ]);
        }
        println!("{table}");
    }
}

fn print_movers(title: &str, movers: &MarketMovers) {
    if movers.gainers.is_empty() && movers.losers.is_empty() && movers.by_volume.is_empty() {
        return;
    }
    println!("\n{}", ui::style_text(title, ui::StyleType::Title));
    print_quote_table("Top Gainers", &movers.gainers);
    print_quote_table("Top Losers", &movers.losers);
    print_volume_table("Most Active", &movers.by_volume);
}

fn print_quote_table(title: &str, quotes: &[Quote]) {
    if quotes.is_empty() {
        return;
    }
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(title),
        ui::header_cell("Price"),
        ui::header_cell("Change"),
    ]);
    for quote in quotes {
        table.add_row(vec![
            Cell::new(&quote.symbol),
            Cell::new(format!("{:.2} {}", quote.current_price, quote.currency)),
            ui::change_cell(quote.change_percent),
        ]);
    }
    println!("{table}");
}

fn print_volume_table(title: &str, quotes: &[Quote]) {
    if quotes.is_empty() {
        return;
    }
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(title),
        ui::header_cell("Price"),
        ui::header_cell("Volume"),
    ]);
    for quote in quotes {
        table.add_row(vec![
            Cell::new(&quote.symbol),
            Cell::new(format!("{:.2} {}", quote.current_price, quote.currency)),
            ui::format_optional_cell(quote.volume, |v| v.to_string()),
        ]);
    }
    println!("{table}");
}
