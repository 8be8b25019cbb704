use keycloak::{KeycloakAdmin, KeycloakAdminToken};
use serde::Deserialize;
use tracing::debug;

use crate::domain::errors::{ContainerResult, KeycloakContainerError};
use crate::domain::settings::{ADMIN_CLI_CLIENT, MASTER_REALM};

/// Credentials of the master-realm admin
#[derive(Debug, Clone)]
pub struct AdminLogin<'a> {
    pub server_url: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

impl AdminLogin<'_> {
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.server_url.trim_end_matches('/'),
            MASTER_REALM
        )
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Admin API client logged in through `admin-cli` with the password grant
pub async fn admin_client(
    login: &AdminLogin<'_>,
    http: reqwest::Client,
) -> ContainerResult<KeycloakAdmin> {
    debug!("Acquiring admin token for {} at {}", login.username, login.server_url);

    let token = KeycloakAdminToken::acquire_custom_realm(
        login.server_url,
        login.username,
        login.password,
        MASTER_REALM,
        ADMIN_CLI_CLIENT,
        "password",
        &http,
    )
    .await?;

    Ok(KeycloakAdmin::new(login.server_url, token, http))
}

/// Raw admin access token, for calling endpoints the admin client does not cover
pub async fn access_token(
    login: &AdminLogin<'_>,
    http: &reqwest::Client,
) -> ContainerResult<String> {
    let response = http
        .post(login.token_endpoint())
        .form(&[
            ("username", login.username),
            ("password", login.password),
            ("grant_type", "password"),
            ("client_id", ADMIN_CLI_CLIENT),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(KeycloakContainerError::Authentication {
            status: status.as_u16(),
            message: text,
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}
