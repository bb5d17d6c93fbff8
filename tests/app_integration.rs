use std::fs;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_quote(server: &MockServer, symbol: &str, price: f64, change_percent: f64) {
        let body = format!(
            r#"{{
                "symbol": "{symbol}",
                "name": "{symbol}",
                "current_price": {price},
                "change": 1.0,
                "change_percent": {change_percent},
                "volume": 1000
            }}"#
        );
        Mock::given(method("GET"))
            .and(path(format!("/stocks/{symbol}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn mount_auth(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token": "integration-token", "token_type": "bearer"}"#,
            ))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "id": 1,
                    "email": "user@example.com",
                    "full_name": "Test User",
                    "is_active": true,
                    "is_admin": false,
                    "created_at": "2024-01-01T00:00:00Z"
                }"#,
            ))
            .mount(server)
            .await;
    }

    pub fn write_config(server_uri: &str, data_dir: &std::path::Path) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let config_content = format!(
            r#"
            backend:
              base_url: "{server_uri}"
            currency: "USD"
            indices:
              - symbol: "SPX"
                name: "S&P 500"
                country: "US"
              - symbol: "NIFTY"
                name: "Nifty 50"
                country: "IN"
                currency: "INR"
            popular_symbols:
              - "AAPL"
              - "TCS.NS"
            data_path: "{}"
        "#,
            data_dir.display()
        );
        std::fs::write(config_file.path(), &config_content).expect("Failed to write config file");
        config_file
    }
}

#[test_log::test(tokio::test)]
async fn test_full_dashboard_flow_with_mock() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_quote(&mock_server, "SPX", 5000.0, 0.4).await;
    test_utils::mount_quote(&mock_server, "NIFTY", 22000.0, -0.2).await;
    test_utils::mount_quote(&mock_server, "AAPL", 175.5, 2.1).await;
    test_utils::mount_quote(&mock_server, "TCS.NS", 3900.0, 1.5).await;

    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = test_utils::write_config(&mock_server.uri(), data_dir.path());

    let result = stockdeck::run_command(
        stockdeck::AppCommand::Dashboard,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Dashboard command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_search_command_renders_results() {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/stocks/search"))
        .and(wiremock::matchers::query_param("q", "apple"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
            r#"[
                {"symbol": "AAPL", "name": "Apple Inc.", "exchange": "NASDAQ"},
                {"symbol": "APLE", "name": "Apple Hospitality REIT", "exchange": "NYSE"}
            ]"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = test_utils::write_config(&mock_server.uri(), data_dir.path());

    let result = stockdeck::run_command(
        stockdeck::AppCommand::Search {
            query: "apple".to_string(),
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Search command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_theme_preference_is_validated_and_persisted() {
    let mock_server = wiremock::MockServer::start().await;
    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = test_utils::write_config(&mock_server.uri(), data_dir.path());
    let config_path = config_file.path().to_str().unwrap().to_string();

    let result = stockdeck::run_command(
        stockdeck::AppCommand::SetTheme {
            theme: "Dark".to_string(),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Theme command failed: {:?}", result.err());

    let result = stockdeck::run_command(
        stockdeck::AppCommand::SetTheme {
            theme: "solarized".to_string(),
        },
        Some(&config_path),
    )
    .await;
    let err = result.expect_err("Unknown theme should be rejected");
    assert!(err.to_string().contains("Unknown theme"));
}

#[test_log::test(tokio::test)]
async fn test_login_persists_across_invocations() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_auth(&mock_server).await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/portfolio"))
        .and(wiremock::matchers::header(
            "authorization",
            "Bearer integration-token",
        ))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
            r#"[{
                "id": 1,
                "stock_symbol": "AAPL",
                "quantity": 10.0,
                "purchase_price": 150.0,
                "purchase_date": "2024-01-15",
                "current_price": 175.5
            }]"#,
        ))
        .mount(&mock_server)
        .await;

    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = test_utils::write_config(&mock_server.uri(), data_dir.path());
    let config_path = config_file.path().to_str().unwrap().to_string();

    let result = stockdeck::run_command(
        stockdeck::AppCommand::Login {
            email: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Login failed with: {:?}", result.err());

    // A fresh invocation restores the persisted token and can read the
    // portfolio without signing in again.
    let result = stockdeck::run_command(
        stockdeck::AppCommand::Portfolio(stockdeck::PortfolioCommand::Show),
        Some(&config_path),
    )
    .await;
    assert!(
        result.is_ok(),
        "Portfolio command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_portfolio_requires_auth() {
    let mock_server = wiremock::MockServer::start().await;
    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = test_utils::write_config(&mock_server.uri(), data_dir.path());

    let result = stockdeck::run_command(
        stockdeck::AppCommand::Portfolio(stockdeck::PortfolioCommand::Show),
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    let err = result.expect_err("Portfolio should be rejected without a session");
    assert!(err.to_string().contains("Not signed in"));
}

#[test_log::test(tokio::test)]
async fn test_logout_clears_persisted_session() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_auth(&mock_server).await;

    let data_dir = tempfile::tempdir().expect("Failed to create data dir");
    let config_file = test_utils::write_config(&mock_server.uri(), data_dir.path());
    let config_path = config_file.path().to_str().unwrap().to_string();

    stockdeck::run_command(
        stockdeck::AppCommand::Login {
            email: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        },
        Some(&config_path),
    )
    .await
    .expect("Login failed");

    stockdeck::run_command(stockdeck::AppCommand::Logout, Some(&config_path))
        .await
        .expect("Logout failed");

    let result = stockdeck::run_command(
        stockdeck::AppCommand::Portfolio(stockdeck::PortfolioCommand::Show),
        Some(&config_path),
    )
    .await;
    assert!(result.is_err(), "Session should be gone after logout");
}

#[test_log::test(tokio::test)]
async fn test_config_parse_failure_is_reported() {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(config_file.path(), "backend: [not, a, mapping]").expect("Failed to write config");

    let result = stockdeck::run_command(
        stockdeck::AppCommand::Dashboard,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    let err = result.expect_err("Malformed config should fail fast");
    assert!(err.to_string().contains("Failed to parse config file"));
}
