#![cfg(all(feature = "web", feature = "sqlite"))]
//! Portfolio API integration tests.
//!
//! Tests cover:
//! - Cryptocurrency catalog reads, search, pagination and superuser writes
//! - Transaction CRUD scoped to the owner
//! - Holdings kept in step with transactions, negative holdings rejected
//! - Service routes: root redirect, health, schema, docs

mod common;

use axum::http::{StatusCode, header};
use cointrack::domain::page::PaginationSettings;
use serde_json::{Value, json};

use common::*;

const CRYPTO_URL: &str = "/api/portfolio/cryptocurrency/";
const TRANSACTION_URL: &str = "/api/portfolio/transaction/";
const HOLDINGS_URL: &str = "/api/portfolio/holdings/";

fn crypto_url(symbol: &str) -> String {
    format!("{CRYPTO_URL}{symbol}/")
}

fn transaction_url(id: &Value) -> String {
    format!("{TRANSACTION_URL}{id}/")
}

fn holding_url(id: &Value) -> String {
    format!("{HOLDINGS_URL}{id}/")
}

fn trade(crypto: &str, kind: &str, amount: &str) -> Value {
    json!({
        "crypto": crypto,
        "date": "2023-09-01T12:00:00Z",
        "type": kind,
        "amount": amount,
        "price": "27000",
    })
}

/// An app with BTC and ETH in the catalog and one logged-in user.
fn portfolio_app() -> (TestApp, String) {
    let app = TestApp::new();
    app.crypto("BTC", "Bitcoin");
    app.crypto("ETH", "Ethereum");
    let token = app.login("trader@example.com");
    (app, token)
}

mod cryptocurrencies {
    use super::*;

    #[tokio::test]
    async fn anonymous_can_list_in_symbol_order() {
        let app = TestApp::new();
        app.crypto("ETH", "Ethereum");
        app.crypto("BTC", "Bitcoin");
        let res = app.get(CRYPTO_URL, None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            res.body,
            json!({
                "count": 2,
                "next": null,
                "previous": null,
                "results": [
                    {"symbol": "BTC", "name": "Bitcoin"},
                    {"symbol": "ETH", "name": "Ethereum"},
                ]
            })
        );
    }

    #[tokio::test]
    async fn query_filters_by_name_case_insensitively() {
        let app = TestApp::new();
        app.crypto("BTC", "Bitcoin");
        app.crypto("BCH", "Bitcoin Cash");
        app.crypto("ETH", "Ethereum");
        let res = app.get(&format!("{CRYPTO_URL}?query=BITCOIN"), None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["count"], 2);
        assert_eq!(res.body["results"][0]["symbol"], "BCH");
        assert_eq!(res.body["results"][1]["symbol"], "BTC");
    }

    #[tokio::test]
    async fn query_treats_wildcards_literally() {
        let app = TestApp::new();
        app.crypto("BTC", "Bitcoin");
        app.crypto("PCT", "100% Coin");
        let res = app.get(&format!("{CRYPTO_URL}?query=%25"), None).await;
        assert_eq!(res.body["count"], 1);
        assert_eq!(res.body["results"][0]["symbol"], "PCT");
    }

    #[tokio::test]
    async fn pages_link_to_each_other() {
        let app = TestApp::new();
        for (symbol, name) in [("ADA", "Cardano"), ("BTC", "Bitcoin"), ("ETH", "Ethereum")] {
            app.crypto(symbol, name);
        }

        let first = app.get(&format!("{CRYPTO_URL}?page_size=2"), None).await;
        assert_eq!(first.body["count"], 3);
        assert_eq!(first.body["results"].as_array().unwrap().len(), 2);
        assert_eq!(
            first.body["next"],
            "/api/portfolio/cryptocurrency/?page_size=2&page=2"
        );
        assert!(first.body["previous"].is_null());

        let second = app
            .get(&format!("{CRYPTO_URL}?page_size=2&page=2"), None)
            .await;
        assert_eq!(second.body["results"], json!([{"symbol": "ETH", "name": "Ethereum"}]));
        assert!(second.body["next"].is_null());
        assert_eq!(
            second.body["previous"],
            "/api/portfolio/cryptocurrency/?page_size=2"
        );
    }

    #[tokio::test]
    async fn page_size_is_capped() {
        let app = TestApp::with_pagination(PaginationSettings {
            page_size: 1,
            max_page_size: 2,
        });
        for (symbol, name) in [("ADA", "Cardano"), ("BTC", "Bitcoin"), ("ETH", "Ethereum")] {
            app.crypto(symbol, name);
        }
        let default = app.get(CRYPTO_URL, None).await;
        assert_eq!(default.body["results"].as_array().unwrap().len(), 1);
        let capped = app.get(&format!("{CRYPTO_URL}?page_size=50"), None).await;
        assert_eq!(capped.body["results"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn page_past_the_end_is_not_found() {
        let app = TestApp::new();
        app.crypto("BTC", "Bitcoin");
        let res = app.get(&format!("{CRYPTO_URL}?page=5"), None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body, json!({"detail": "Invalid page."}));
    }

    #[tokio::test]
    async fn retrieve_normalizes_symbol() {
        let app = TestApp::new();
        app.crypto("BTC", "Bitcoin");
        let res = app.get(&crypto_url("btc"), None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, json!({"symbol": "BTC", "name": "Bitcoin"}));

        let missing = app.get(&crypto_url("XRP"), None).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.body, json!({"detail": "Not found."}));
    }

    #[tokio::test]
    async fn create_requires_superuser() {
        let app = TestApp::new();
        let body = json!({"symbol": "DOGE", "name": "Dogecoin"});

        let anonymous = app.post(CRYPTO_URL, None, body.clone()).await;
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

        let token = app.login("user@example.com");
        let regular = app.post(CRYPTO_URL, Some(&token), body).await;
        assert_eq!(regular.status, StatusCode::FORBIDDEN);
        assert_eq!(
            regular.body["detail"],
            "You do not have permission to perform this action."
        );
        assert_eq!(app.get(CRYPTO_URL, None).await.body["count"], 0);
    }

    #[tokio::test]
    async fn superuser_creates_and_duplicate_is_rejected() {
        let app = TestApp::new();
        let token = app.login_superuser("admin@example.com");

        let res = app
            .post(CRYPTO_URL, Some(&token), json!({"symbol": " doge ", "name": "Dogecoin"}))
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body, json!({"symbol": "DOGE", "name": "Dogecoin"}));

        let dup = app
            .post(CRYPTO_URL, Some(&token), json!({"symbol": "DOGE", "name": "Other"}))
            .await;
        assert_eq!(dup.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            dup.body,
            json!({"symbol": ["cryptocurrency with this symbol already exists."]})
        );
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let app = TestApp::new();
        let token = app.login_superuser("admin@example.com");
        let res = app
            .post(
                CRYPTO_URL,
                Some(&token),
                json!({"symbol": "TOOLONGSYMBOL", "name": ""}),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body["symbol"][0],
            "Ensure this field has no more than 10 characters."
        );
        assert_eq!(res.body["name"][0], "This field may not be blank.");
    }

    #[tokio::test]
    async fn rename_keeps_symbol() {
        let app = TestApp::new();
        app.crypto("BTC", "Bitcoin");
        let token = app.login_superuser("admin@example.com");

        let res = app
            .patch(&crypto_url("BTC"), Some(&token), json!({"name": "Bitcoin Core"}))
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, json!({"symbol": "BTC", "name": "Bitcoin Core"}));

        let changed = app
            .put(
                &crypto_url("BTC"),
                Some(&token),
                json!({"symbol": "XBT", "name": "Bitcoin"}),
            )
            .await;
        assert_eq!(changed.status, StatusCode::BAD_REQUEST);
        assert_eq!(changed.body["symbol"][0], "Symbol cannot be changed.");

        let no_name = app.put(&crypto_url("BTC"), Some(&token), json!({})).await;
        assert_eq!(no_name.status, StatusCode::BAD_REQUEST);
        assert_eq!(no_name.body["name"][0], "This field is required.");
    }

    #[tokio::test]
    async fn delete_cascades_to_transactions_and_holdings() {
        let (app, token) = portfolio_app();
        let admin = app.login_superuser("admin@example.com");
        app.post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "1"))
            .await;

        let res = app.delete(&crypto_url("BTC"), Some(&admin)).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert_eq!(app.get(&crypto_url("BTC"), None).await.status, StatusCode::NOT_FOUND);
        assert_eq!(app.get(TRANSACTION_URL, Some(&token)).await.body["count"], 0);
        assert_eq!(app.get(HOLDINGS_URL, Some(&token)).await.body["count"], 0);

        let again = app.delete(&crypto_url("BTC"), Some(&admin)).await;
        assert_eq!(again.status, StatusCode::NOT_FOUND);
    }
}

mod transactions {
    use super::*;

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::new();
        let res = app.get(TRANSACTION_URL, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_and_retrieve() {
        let (app, token) = portfolio_app();
        let res = app
            .post(TRANSACTION_URL, Some(&token), trade("btc", "buy", "1.5"))
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["crypto"], "BTC");
        assert_eq!(res.body["type"], "buy");
        assert_eq!(res.body["amount"], "1.50000");
        assert_eq!(res.body["price"], "27000.00000");
        assert_eq!(res.body["date"], "2023-09-01T12:00:00Z");

        let detail = app.get(&transaction_url(&res.body["id"]), Some(&token)).await;
        assert_eq!(detail.status, StatusCode::OK);
        assert_eq!(detail.body, res.body);
    }

    #[tokio::test]
    async fn numeric_amounts_accepted() {
        let (app, token) = portfolio_app();
        let res = app
            .post(
                TRANSACTION_URL,
                Some(&token),
                json!({
                    "crypto": "ETH",
                    "date": "2023-09-01T12:00:00",
                    "type": "buy",
                    "amount": 2,
                    "price": 1650.5,
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body["amount"], "2.00000");
        assert_eq!(res.body["price"], "1650.50000");
    }

    #[tokio::test]
    async fn unknown_crypto_rejected() {
        let (app, token) = portfolio_app();
        let res = app
            .post(TRANSACTION_URL, Some(&token), trade("XRP", "buy", "1"))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body,
            json!({"crypto": ["Invalid crypto. This crypto does not exist."]})
        );
    }

    #[tokio::test]
    async fn malformed_fields_reported_per_field() {
        let (app, token) = portfolio_app();
        let res = app
            .post(
                TRANSACTION_URL,
                Some(&token),
                json!({"crypto": "BTC", "type": "buy", "amount": "lots", "price": "1", "date": "yesterday"}),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["amount"][0], "A valid number is required.");
        assert!(res.body["date"][0].as_str().unwrap().starts_with("Datetime has wrong format."));
    }

    #[tokio::test]
    async fn oversized_amount_rejected_not_rounded() {
        let (app, token) = portfolio_app();
        let res = app
            .post(
                TRANSACTION_URL,
                Some(&token),
                trade("BTC", "buy", "999999999999999999999999.12345"),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body["amount"][0],
            "Ensure that there are no more than 28 digits in total."
        );

        let res = app
            .post(
                TRANSACTION_URL,
                Some(&token),
                trade("BTC", "buy", "999999999999999999999999.1"),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body["amount"][0],
            "Ensure that there are no more than 23 digits before the decimal point."
        );
        assert_eq!(app.get(TRANSACTION_URL, Some(&token)).await.body["count"], 0);
    }

    #[tokio::test]
    async fn malformed_query_string_is_json_error() {
        let (app, token) = portfolio_app();
        let res = app
            .get(&format!("{TRANSACTION_URL}?page=1&page=2"), Some(&token))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert!(res.body["detail"].is_string());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_scoped_to_owner() {
        let (app, token) = portfolio_app();
        let other = app.login("other@example.com");
        let mut older = trade("BTC", "buy", "1");
        older["date"] = json!("2023-01-01T00:00:00Z");
        app.post(TRANSACTION_URL, Some(&token), older).await;
        app.post(TRANSACTION_URL, Some(&token), trade("ETH", "buy", "2"))
            .await;
        app.post(TRANSACTION_URL, Some(&other), trade("BTC", "buy", "9"))
            .await;

        let res = app.get(TRANSACTION_URL, Some(&token)).await;
        assert_eq!(res.body["count"], 2);
        assert_eq!(res.body["results"][0]["crypto"], "ETH");
        assert_eq!(res.body["results"][1]["crypto"], "BTC");
    }

    #[tokio::test]
    async fn other_users_transactions_are_not_found() {
        let (app, token) = portfolio_app();
        let other = app.login("other@example.com");
        let created = app
            .post(TRANSACTION_URL, Some(&other), trade("BTC", "buy", "1"))
            .await;
        let url = transaction_url(&created.body["id"]);

        assert_eq!(app.get(&url, Some(&token)).await.status, StatusCode::NOT_FOUND);
        assert_eq!(
            app.patch(&url, Some(&token), json!({"amount": "5"})).await.status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(app.delete(&url, Some(&token)).await.status, StatusCode::NOT_FOUND);
        assert_eq!(app.get(&url, Some(&other)).await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn non_numeric_id_is_not_found() {
        let (app, token) = portfolio_app();
        let res = app.get(&format!("{TRANSACTION_URL}abc/"), Some(&token)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn put_requires_every_field() {
        let (app, token) = portfolio_app();
        let created = app
            .post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "1"))
            .await;
        let res = app
            .put(
                &transaction_url(&created.body["id"]),
                Some(&token),
                json!({"amount": "2"}),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["crypto"][0], "This field is required.");
        assert_eq!(res.body["price"][0], "This field is required.");
    }

    #[tokio::test]
    async fn delete_removes_transaction() {
        let (app, token) = portfolio_app();
        let created = app
            .post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "1"))
            .await;
        let url = transaction_url(&created.body["id"]);
        let res = app.delete(&url, Some(&token)).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert_eq!(app.get(&url, Some(&token)).await.status, StatusCode::NOT_FOUND);
    }
}

mod holdings {
    use super::*;

    #[tokio::test]
    async fn buys_and_sells_net_out() {
        let (app, token) = portfolio_app();
        app.post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "10"))
            .await;
        app.post(TRANSACTION_URL, Some(&token), trade("BTC", "sell", "3.5"))
            .await;

        let res = app.get(HOLDINGS_URL, Some(&token)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["count"], 1);
        assert_eq!(res.body["results"][0]["crypto"], "BTC");
        assert_eq!(res.body["results"][0]["amount"], "6.50000");

        let detail = app
            .get(&holding_url(&res.body["results"][0]["id"]), Some(&token))
            .await;
        assert_eq!(detail.status, StatusCode::OK);
        assert_eq!(detail.body, res.body["results"][0]);
    }

    #[tokio::test]
    async fn oversell_rejected_and_nothing_recorded() {
        let (app, token) = portfolio_app();
        app.post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "1"))
            .await;
        let res = app
            .post(TRANSACTION_URL, Some(&token), trade("BTC", "sell", "2"))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body,
            json!({"non_field_errors": ["Transaction would result in negative holdings."]})
        );
        assert_eq!(app.get(TRANSACTION_URL, Some(&token)).await.body["count"], 1);
        let holdings = app.get(HOLDINGS_URL, Some(&token)).await;
        assert_eq!(holdings.body["results"][0]["amount"], "1.00000");
    }

    #[tokio::test]
    async fn holding_past_fifteen_whole_digits_rejected() {
        let (app, token) = portfolio_app();
        let res = app
            .post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "999999999999999"))
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        let res = app
            .post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "1"))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body,
            json!({"non_field_errors": [
                "Transaction would result in holdings with more than 15 digits before the decimal point."
            ]})
        );
        let holdings = app.get(HOLDINGS_URL, Some(&token)).await;
        assert_eq!(holdings.body["results"][0]["amount"], "999999999999999.00000");
    }

    #[tokio::test]
    async fn sell_without_holding_rejected() {
        let (app, token) = portfolio_app();
        let res = app
            .post(TRANSACTION_URL, Some(&token), trade("ETH", "sell", "0.5"))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(app.get(HOLDINGS_URL, Some(&token)).await.body["count"], 0);
    }

    #[tokio::test]
    async fn deleting_covering_buy_rejected() {
        let (app, token) = portfolio_app();
        let buy = app
            .post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "2"))
            .await;
        app.post(TRANSACTION_URL, Some(&token), trade("BTC", "sell", "1"))
            .await;

        let res = app.delete(&transaction_url(&buy.body["id"]), Some(&token)).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body["non_field_errors"][0],
            "Deleting this 'buy' transaction would result in negative holdings."
        );
        assert_eq!(app.get(TRANSACTION_URL, Some(&token)).await.body["count"], 2);
    }

    #[tokio::test]
    async fn selling_everything_removes_holding() {
        let (app, token) = portfolio_app();
        app.post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "2"))
            .await;
        app.post(TRANSACTION_URL, Some(&token), trade("BTC", "sell", "2"))
            .await;
        assert_eq!(app.get(HOLDINGS_URL, Some(&token)).await.body["count"], 0);
    }

    #[tokio::test]
    async fn moving_transaction_between_coins_updates_both() {
        let (app, token) = portfolio_app();
        let buy = app
            .post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "1"))
            .await;
        let res = app
            .patch(
                &transaction_url(&buy.body["id"]),
                Some(&token),
                json!({"crypto": "ETH"}),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["crypto"], "ETH");
        assert_eq!(res.body["amount"], "1.00000");

        let holdings = app.get(HOLDINGS_URL, Some(&token)).await;
        assert_eq!(holdings.body["count"], 1);
        assert_eq!(holdings.body["results"][0]["crypto"], "ETH");
    }

    #[tokio::test]
    async fn shrinking_covering_buy_rejected() {
        let (app, token) = portfolio_app();
        let buy = app
            .post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "3"))
            .await;
        app.post(TRANSACTION_URL, Some(&token), trade("BTC", "sell", "2"))
            .await;
        let res = app
            .patch(
                &transaction_url(&buy.body["id"]),
                Some(&token),
                json!({"amount": "1"}),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        let holdings = app.get(HOLDINGS_URL, Some(&token)).await;
        assert_eq!(holdings.body["results"][0]["amount"], "1.00000");
    }

    #[tokio::test]
    async fn ordered_by_amount_then_symbol() {
        let app = TestApp::new();
        for (symbol, name) in [("ADA", "Cardano"), ("BTC", "Bitcoin"), ("ETH", "Ethereum")] {
            app.crypto(symbol, name);
        }
        let token = app.login("trader@example.com");
        app.post(TRANSACTION_URL, Some(&token), trade("BTC", "buy", "2"))
            .await;
        app.post(TRANSACTION_URL, Some(&token), trade("ETH", "buy", "5"))
            .await;
        app.post(TRANSACTION_URL, Some(&token), trade("ADA", "buy", "5"))
            .await;

        let res = app.get(HOLDINGS_URL, Some(&token)).await;
        let order: Vec<&str> = res.body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["crypto"].as_str().unwrap())
            .collect();
        assert_eq!(order, ["ADA", "ETH", "BTC"]);
    }

    #[tokio::test]
    async fn other_users_holdings_hidden() {
        let (app, token) = portfolio_app();
        let other = app.login("other@example.com");
        app.post(TRANSACTION_URL, Some(&other), trade("BTC", "buy", "1"))
            .await;
        let theirs = app.get(HOLDINGS_URL, Some(&other)).await;
        let id = &theirs.body["results"][0]["id"];

        assert_eq!(app.get(HOLDINGS_URL, Some(&token)).await.body["count"], 0);
        assert_eq!(
            app.get(&holding_url(id), Some(&token)).await.status,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn holdings_are_read_only() {
        let (app, token) = portfolio_app();
        let res = app
            .post(HOLDINGS_URL, Some(&token), json!({"crypto": "BTC", "amount": "1"}))
            .await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    }
}

mod service {
    use super::*;

    #[tokio::test]
    async fn root_redirects_to_docs() {
        let app = TestApp::new();
        let res = app.get("/", None).await;
        assert_eq!(res.status, StatusCode::FOUND);
        assert_eq!(res.headers[header::LOCATION], "/api/docs/");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = TestApp::new();
        let res = app.get("/api/health/", None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, json!({"healthy": true}));
    }

    #[tokio::test]
    async fn schema_lists_api_paths() {
        let app = TestApp::new();
        let res = app.get("/api/schema/", None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body["paths"].get("/api/portfolio/holdings/").is_some());
        assert!(res.body["paths"].get("/api/user/token/").is_some());
    }

    #[tokio::test]
    async fn docs_page_points_at_schema() {
        let app = TestApp::new();
        let res = app.get("/api/docs/", None).await;
        assert_eq!(res.status, StatusCode::OK);
        let html = res.body.as_str().unwrap();
        assert!(html.contains("/api/schema/"));
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let app = TestApp::new();
        let res = app.get("/api/nope/", None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body, json!({"detail": "Not found."}));
    }
}
