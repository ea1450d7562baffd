use async_trait::async_trait;
use reqwest::{Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::*;
use crate::{ApiError, DEFAULT_GAME_VERSION};

type Result<T> = std::result::Result<T, ApiError>;

/// Where and how to reach the leaderboard service.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    /// f.e. "https://vps.kodub.com/leaderboard"
    pub leaderboard_url: String,

    /// f.e. "https://vps.kodub.com/user"
    pub user_url: String,

    /// If set, every request is sent to this URL instead, with the
    /// actual request URL in the `url` query parameter.
    pub proxy_url: Option<String>,

    /// The game version sent with every request.
    pub version: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            leaderboard_url: "https://vps.kodub.com/leaderboard".to_string(),
            user_url: "https://vps.kodub.com/user".to_string(),
            proxy_url: None,
            version: DEFAULT_GAME_VERSION.to_string(),
        }
    }
}

/// Leaderboard service client that sends HTTP requests.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    settings: ApiSettings,
}

impl ApiClient {
    pub fn new(settings: ApiSettings, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(ApiClient { http, settings })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    /// Send a GET request to the given endpoint, and parse its JSON response.
    async fn get<T>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let request = self.request(endpoint, params)?;
        log::debug!("GET {}", request.url());

        let response = self.http.execute(request).await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
            status if !status.is_success() => return Err(ApiError::Status(status.as_u16())),
            _ => {}
        }

        let json: String = response.text().await?;
        Ok(serde_json::from_str::<T>(&json)?)
    }

    fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Request> {
        let direct = self.http.get(endpoint).query(params).build()?;
        match &self.settings.proxy_url {
            None => Ok(direct),
            Some(proxy) => Ok(self
                .http
                .get(proxy)
                .query(&[("url", direct.url().as_str())])
                .build()?),
        }
    }
}

#[async_trait]
impl Calls for ApiClient {
    async fn leaderboard(&self, query: &LeaderboardQuery<'_>) -> Result<LeaderboardPage> {
        let params = query.params(&self.settings.version);
        self.get(&self.settings.leaderboard_url, &params).await
    }

    async fn user(&self, user_token: &str) -> Result<UserProfile> {
        let params = [
            ("version", self.settings.version.clone()),
            ("userToken", user_token.to_string()),
        ];
        self.get(&self.settings.user_url, &params).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn direct_request_url() {
        let client = ApiClient::new(ApiSettings::default(), "test").unwrap();
        let query = LeaderboardQuery::slice("abc", 20, 10);
        let request = client
            .request(&client.settings.leaderboard_url, &query.params("0.5.1"))
            .unwrap();
        assert_eq!(
            "https://vps.kodub.com/leaderboard?version=0.5.1&trackId=abc&skip=20&amount=10&onlyVerified=false",
            request.url().as_str()
        );
    }

    #[test]
    fn proxied_request_url() {
        let settings = ApiSettings {
            proxy_url: Some("https://proxy.example.com/".to_string()),
            ..ApiSettings::default()
        };
        let client = ApiClient::new(settings, "test").unwrap();
        let request = client
            .request(
                &client.settings.user_url,
                &[("version", "0.5.1".to_string())],
            )
            .unwrap();
        let url = request.url();
        assert_eq!(Some("proxy.example.com"), url.host_str());
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!("url", key);
        assert_eq!("https://vps.kodub.com/user?version=0.5.1", value);
    }
}
