use serde_json::json;

use crate::{ApiClient, ApiRequest, ApiResult, LinkedAccount, TokenData, UserData};

/// Account creation, login and external account linking
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// Exchanges a username and password for a bearer token
    pub async fn token(&self, username: &str, password: &str) -> ApiResult<TokenData> {
        self.client
            .send(
                ApiRequest::get("/auth/token")
                    .basic(username, password)
                    .expect_fields(&["token", "expires_at"]),
            )
            .await
    }

    /// Creates an account. The backend answers 409 if the username is taken.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> ApiResult<UserData> {
        self.client
            .send(
                ApiRequest::post("/user")
                    .basic(username, password)
                    .json(&json!({ "display_name": display_name })),
            )
            .await
    }

    pub async fn user(&self, token: &str) -> ApiResult<UserData> {
        self.client
            .send(
                ApiRequest::get("/user")
                    .bearer(token)
                    .expect_fields(&["id", "username"]),
            )
            .await
    }

    /// Where the browser goes to start linking a Spotify account
    pub fn spotify_authorize_url(&self, redirect_uri: &str) -> ApiResult<String> {
        let mut url = self.client.url_for("/spotify/authorize")?;
        url.query_pairs_mut().append_pair("redirect_uri", redirect_uri);

        Ok(url.to_string())
    }

    /// Finishes linking with the code the OAuth provider handed back
    pub async fn link_spotify(
        &self,
        token: &str,
        code: &str,
        redirect_uri: &str,
    ) -> ApiResult<LinkedAccount> {
        self.client
            .send(
                ApiRequest::post("/user/spotify")
                    .bearer(token)
                    .json(&json!({ "code": code, "redirect_uri": redirect_uri }))
                    .expect_fields(&["name"]),
            )
            .await
    }

    pub async fn unlink_spotify(&self, token: &str) -> ApiResult<()> {
        self.client
            .execute(ApiRequest::delete("/user/spotify").bearer(token))
            .await
            .map(|_| ())
    }
}
