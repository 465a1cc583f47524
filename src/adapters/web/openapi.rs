//! Generated OpenAPI document.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::{
    CredentialsRequest, CryptocurrencyBody, CryptocurrencyPage, CryptocurrencyRequest,
    HealthBody, HoldingBody, HoldingPage, ProfileRequest, RegisterRequest, TokenBody,
    TransactionBody, TransactionPage, TransactionRequest, UserBody,
};
use super::{cryptocurrencies, handlers, holdings, transactions, users};

#[derive(OpenApi)]
#[openapi(
    info(title = "cointrack", description = "Cryptocurrency portfolio tracker API"),
    paths(
        handlers::health,
        users::create_user,
        users::create_token,
        users::retrieve_me,
        users::update_me,
        users::partial_update_me,
        cryptocurrencies::list_cryptocurrencies,
        cryptocurrencies::create_cryptocurrency,
        cryptocurrencies::retrieve_cryptocurrency,
        cryptocurrencies::update_cryptocurrency,
        cryptocurrencies::partial_update_cryptocurrency,
        cryptocurrencies::destroy_cryptocurrency,
        transactions::list_transactions,
        transactions::create_transaction,
        transactions::retrieve_transaction,
        transactions::update_transaction,
        transactions::partial_update_transaction,
        transactions::destroy_transaction,
        holdings::list_holdings,
        holdings::retrieve_holding,
    ),
    components(schemas(
        HealthBody,
        RegisterRequest,
        CredentialsRequest,
        ProfileRequest,
        UserBody,
        TokenBody,
        CryptocurrencyRequest,
        CryptocurrencyBody,
        CryptocurrencyPage,
        TransactionRequest,
        TransactionBody,
        TransactionPage,
        HoldingBody,
        HoldingPage,
    )),
    modifiers(&TokenSecurity),
    tags(
        (name = "health"),
        (name = "user", description = "Accounts and API tokens"),
        (name = "cryptocurrency", description = "Cryptocurrency catalog"),
        (name = "transaction", description = "Buy and sell transactions"),
        (name = "holdings", description = "Net holdings derived from transactions")
    )
)]
pub struct ApiDoc;

/// Registers the `Authorization: Token <key>` scheme referenced by `security(("token" = []))`.
struct TokenSecurity;

impl Modify for TokenSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}
