pub mod dashboard;
pub mod portfolio;
pub mod quote;
pub mod ui;
pub mod watchlist;
