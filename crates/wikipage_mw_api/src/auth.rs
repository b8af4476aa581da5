use crate::error::MwApiError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::info;

fn check_error(resp: &Value) -> Result<(), MwApiError> {
    match resp.get("error") {
        Some(error) => Err(MwApiError::from_error_object(error)),
        None => Ok(()),
    }
}

/// Fetches a token of the given API type.
///
/// With `csrf` style servers the token comes from `meta=tokens`; older
/// servers hand out page-scoped tokens through `prop=info&intoken=`.
pub async fn fetch_token(
    client: &Client,
    api_url: &url::Url,
    token_type: &str,
    legacy_title: Option<&str>,
) -> Result<String, MwApiError> {
    let resp: Value = match legacy_title {
        None => {
            client
                .get(api_url.as_str())
                .query(&[("action", "query"), ("meta", "tokens"), ("type", token_type), ("format", "json")])
                .send()
                .await?
                .json()
                .await?
        }
        Some(title) => {
            client
                .get(api_url.as_str())
                .query(&[
                    ("action", "query"),
                    ("prop", "info"),
                    ("intoken", token_type),
                    ("titles", title),
                    ("format", "json"),
                ])
                .send()
                .await?
                .json()
                .await?
        }
    };
    check_error(&resp)?;

    let key = format!("{token_type}token");
    let token = match legacy_title {
        None => resp["query"]["tokens"][key.as_str()].as_str(),
        Some(_) => resp["query"]["pages"]
            .as_object()
            .and_then(|pages| pages.values().next())
            .and_then(|page| page[key.as_str()].as_str()),
    };
    token.map(String::from).ok_or_else(|| MwApiError::AuthError {
        reason: format!("No {token_type} token returned"),
    })
}

pub async fn login_bot_password(
    client: &Client,
    api_url: &url::Url,
    username: &str,
    password: &SecretString,
) -> Result<(), MwApiError> {
    let token = fetch_token(client, api_url, "login", None).await?;

    let resp: Value = client
        .post(api_url.as_str())
        .form(&[
            ("action", "login"),
            ("lgname", username),
            ("lgpassword", password.expose_secret()),
            ("lgtoken", token.as_str()),
            ("format", "json"),
        ])
        .send()
        .await?
        .json()
        .await?;
    check_error(&resp)?;

    let result = resp["login"]["result"].as_str().unwrap_or("");
    if result == "Success" {
        info!(username, "Login successful");
        Ok(())
    } else {
        let reason = resp["login"]["reason"].as_str().unwrap_or("Unknown").to_string();
        Err(MwApiError::AuthError { reason })
    }
}
