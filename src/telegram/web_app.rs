//! Web-app launch handling.
//!
//! The mini-app is opened through `messages.requestAppWebView`; the returned
//! URL carries a signed `tgWebAppData` payload in its fragment, which the game
//! backend accepts as its credential.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;
use url::form_urlencoded;

use super::TelegramError;

const WEB_APP_DATA_KEY: &str = "tgWebAppData";

/// Errors produced while turning a launch URL into a credential.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebAppError {
    #[error("Invalid web app URL: {0}")]
    InvalidUrl(String),

    #[error("Web app URL has no tgWebAppData parameter")]
    MissingData,

    #[error("Web app data has no {0} field")]
    MissingField(&'static str),
}

/// How the decoded `tgWebAppData` becomes the API token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenFormat {
    /// The once-decoded payload, sent verbatim.
    #[default]
    Raw,
    /// The payload decoded again and rebuilt from `query_id`, `user`,
    /// `auth_date` and `hash`.
    Fields,
}

impl FromStr for TokenFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "fields" => Ok(Self::Fields),
            other => Err(format!("unknown token format: {other}")),
        }
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Raw => "raw",
            Self::Fields => "fields",
        })
    }
}

/// A bot user resolved to its MTProto identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotPeer {
    pub user_id: i64,
    pub access_hash: i64,
}

/// Which web app to open and with what launch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAppTarget {
    pub bot_username: String,
    pub app_short_name: String,
    pub start_param: String,
    pub platform: String,
}

impl WebAppTarget {
    /// Target opened the way the Android client does.
    #[must_use]
    pub fn android(bot_username: &str, app_short_name: &str, start_param: &str) -> Self {
        Self {
            bot_username: bot_username.to_owned(),
            app_short_name: app_short_name.to_owned(),
            start_param: start_param.to_owned(),
            platform: "android".to_owned(),
        }
    }
}

/// Telegram operations needed to launch a web app.
#[async_trait]
pub trait WebAppLauncher: Send + Sync {
    /// Returns true if the session is logged in.
    async fn is_authorized(&self) -> Result<bool, TelegramError>;

    /// Resolves the bot username to an input peer.
    async fn resolve_bot(&self, username: &str) -> Result<BotPeer, TelegramError>;

    /// Requests the web view and returns its launch URL.
    async fn request_app_url(
        &self,
        bot: &BotPeer,
        target: &WebAppTarget,
    ) -> Result<String, TelegramError>;
}

/// Extracts `tgWebAppData` from a launch URL, URL-decoded once.
pub fn extract_web_app_data(launch_url: &str) -> Result<String, WebAppError> {
    let url = Url::parse(launch_url).map_err(|e| WebAppError::InvalidUrl(e.to_string()))?;

    // Launch parameters normally live in the fragment; some clients use the query.
    [url.fragment(), url.query()]
        .into_iter()
        .flatten()
        .flat_map(|part| form_urlencoded::parse(part.as_bytes()))
        .find(|(key, _)| key == WEB_APP_DATA_KEY)
        .map(|(_, value)| value.into_owned())
        .ok_or(WebAppError::MissingData)
}

/// Builds the API token from once-decoded web-app data.
pub fn build_auth_token(web_app_data: &str, format: TokenFormat) -> Result<String, WebAppError> {
    match format {
        TokenFormat::Raw => Ok(web_app_data.to_owned()),
        TokenFormat::Fields => {
            let fields: HashMap<String, String> = form_urlencoded::parse(web_app_data.as_bytes())
                .into_owned()
                .collect();
            let field = |name: &'static str| {
                fields
                    .get(name)
                    .map(String::as_str)
                    .ok_or(WebAppError::MissingField(name))
            };

            let mut token = form_urlencoded::Serializer::new(String::new());
            if let Ok(query_id) = field("query_id") {
                token.append_pair("query_id", query_id);
            }
            token
                .append_pair("user", field("user")?)
                .append_pair("auth_date", field("auth_date")?)
                .append_pair("hash", field("hash")?);
            Ok(token.finish())
        }
    }
}

/// Extracts and builds the token in one step.
pub fn auth_token_from_url(launch_url: &str, format: TokenFormat) -> Result<String, WebAppError> {
    build_auth_token(&extract_web_app_data(launch_url)?, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAUNCH_URL: &str = "https://app.example.test/#tgWebAppData=query_id%3DAAF1%26user%3D%257B%2522id%2522%253A42%252C%2522first_name%2522%253A%2522Ann%2522%257D%26auth_date%3D1700000000%26hash%3Dabc123&tgWebAppVersion=7.10&tgWebAppPlatform=android";

    #[test]
    fn test_extract_decodes_once() {
        let data = extract_web_app_data(LAUNCH_URL).unwrap();
        assert_eq!(
            data,
            "query_id=AAF1&user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ann%22%7D&auth_date=1700000000&hash=abc123"
        );
    }

    #[test]
    fn test_raw_token_is_decoded_payload() {
        let token = auth_token_from_url(LAUNCH_URL, TokenFormat::Raw).unwrap();
        assert!(token.starts_with("query_id=AAF1&user=%7B"));
    }

    #[test]
    fn test_fields_token_reencodes_user() {
        let token = auth_token_from_url(LAUNCH_URL, TokenFormat::Fields).unwrap();
        assert_eq!(
            token,
            "query_id=AAF1&user=%7B%22id%22%3A42%2C%22first_name%22%3A%22Ann%22%7D&auth_date=1700000000&hash=abc123"
        );
    }

    #[test]
    fn test_fields_token_requires_hash() {
        let err = build_auth_token("user=%7B%7D&auth_date=1", TokenFormat::Fields).unwrap_err();
        assert_eq!(err, WebAppError::MissingField("hash"));
    }

    #[test]
    fn test_fields_token_without_query_id() {
        let token = build_auth_token("user=u&auth_date=1&hash=h", TokenFormat::Fields).unwrap();
        assert_eq!(token, "user=u&auth_date=1&hash=h");
    }

    #[test]
    fn test_missing_data() {
        assert_eq!(
            extract_web_app_data("https://app.example.test/#tgWebAppVersion=7.10"),
            Err(WebAppError::MissingData)
        );
        assert!(matches!(
            extract_web_app_data("not a url"),
            Err(WebAppError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_data_in_query() {
        let data = extract_web_app_data("https://app.example.test/?tgWebAppData=a%3D1").unwrap();
        assert_eq!(data, "a=1");
    }

    #[test]
    fn test_token_format_parse() {
        assert_eq!("Fields".parse::<TokenFormat>(), Ok(TokenFormat::Fields));
        assert_eq!("raw".parse::<TokenFormat>(), Ok(TokenFormat::Raw));
        assert!("base64".parse::<TokenFormat>().is_err());
    }
}
