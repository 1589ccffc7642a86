//! reqwest-backed [`RedditApi`].
//!
//! Every call carries `Authorization: Bearer …` and a `User-Agent` of the
//! form `{app_name}/0.1`, which Reddit requires. Listing endpoints are
//! requested with `raw_json=1` so URLs arrive unescaped.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use super::errors::RedditError;
use super::types::{
    self, AccessToken, KarmaEntry, Listing, NewPost, Page, PostComment, PostSummary, RawComment,
    RawIdentity, RawJsonEnvelope, RawKarmaList, RawPost, RawSubreddit, RawTrophyList,
    SearchResult, SubmissionResult, SubscribedSubreddit, Trophy, UserComment, UserInfo, UserPost,
    VoteDirection,
};
use super::RedditApi;
use crate::config::RedditConfig;

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum body length kept in error values.
const ERROR_BODY_LIMIT: usize = 512;

// ─── RedditClient ────────────────────────────────────────────────────────────

pub struct RedditClient {
    http: HttpClient,
    api_base: Url,
    auth_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl RedditClient {
    pub fn from_config(config: &RedditConfig) -> Result<Self, RedditError> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("{}/0.1", config.app_name))
            .build()
            .map_err(|e| RedditError::Config {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let api_base = Url::parse(&config.api_base_url).map_err(|e| RedditError::Config {
            reason: format!("invalid api_base_url '{}': {e}", config.api_base_url),
        })?;
        if api_base.cannot_be_a_base() {
            return Err(RedditError::Config {
                reason: format!("api_base_url '{}' cannot be a base", config.api_base_url),
            });
        }

        Ok(Self {
            http,
            api_base,
            auth_base: config.auth_base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// Join path segments onto the API base. Each segment is percent-encoded,
    /// so a value containing `/`, `?` or `..` stays inside its own segment.
    fn api_url(&self, segments: &[&str]) -> Result<Url, RedditError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| RedditError::Config {
                reason: format!("api_base_url '{}' cannot be a base", self.api_base),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, RedditError> {
        let url = self.api_url(segments)?;
        let request = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .query(&[("raw_json", "1")])
            .query(query);
        send_json(url.as_str(), request).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        token: &str,
        segments: &[&str],
        form: &[(&str, String)],
    ) -> Result<T, RedditError> {
        let url = self.api_url(segments)?;
        let request = self.http.post(url.clone()).bearer_auth(token).form(form);
        send_json(url.as_str(), request).await
    }
}

/// Build listing query parameters. `after` is omitted when unset.
fn page_query(page: &Page) -> Vec<(&'static str, String)> {
    let mut query = vec![("limit", page.limit.to_string())];
    if let Some(after) = &page.after {
        query.push(("after", after.clone()));
    }
    query
}

/// Send a request and decode a JSON body, mapping every failure mode.
async fn send_json<T: DeserializeOwned>(
    endpoint: &str,
    request: RequestBuilder,
) -> Result<T, RedditError> {
    tracing::debug!(endpoint, "reddit request");

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            RedditError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            RedditError::Connection {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(RedditError::Unauthorized {
            endpoint: endpoint.to_string(),
        });
    }
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        body.truncate(floor_char_boundary(&body, ERROR_BODY_LIMIT));
        tracing::warn!(endpoint, status = status.as_u16(), "reddit request failed");
        return Err(RedditError::Http {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await.map_err(|e| RedditError::Connection {
        endpoint: endpoint.to_string(),
        reason: format!("failed to read body: {e}"),
    })?;

    serde_json::from_str(&text).map_err(|e| RedditError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|&i| s.is_char_boundary(i)).unwrap_or(0)
}

#[async_trait]
impl RedditApi for RedditClient {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, RedditError> {
        let url = format!("{}/api/v1/access_token", self.auth_base);
        let request = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ]);

        // A bad code comes back as 200 {"error": "invalid_grant"}.
        let body: serde_json::Value = send_json(&url, request).await?;
        if let Some(err) = body.get("error") {
            return Err(RedditError::Api {
                messages: vec![err.as_str().unwrap_or("token exchange failed").to_string()],
            });
        }
        serde_json::from_value(body).map_err(|e| RedditError::Decode {
            endpoint: url,
            reason: e.to_string(),
        })
    }

    async fn identity(&self, token: &str) -> Result<UserInfo, RedditError> {
        let me: RawIdentity = self.get_json(token, &["api", "v1", "me"], &[]).await?;
        if me.name.is_empty() {
            return Err(RedditError::Decode {
                endpoint: self.api_url(&["api", "v1", "me"])?.to_string(),
                reason: "identity response has no username".into(),
            });
        }
        Ok(types::shape_user_info(me))
    }

    async fn karma(&self, token: &str) -> Result<Vec<KarmaEntry>, RedditError> {
        let list: RawKarmaList = self.get_json(token, &["api", "v1", "me", "karma"], &[]).await?;
        Ok(types::shape_karma(list))
    }

    async fn trophies(&self, token: &str) -> Result<Vec<Trophy>, RedditError> {
        let list: RawTrophyList = self.get_json(token, &["api", "v1", "me", "trophies"], &[]).await?;
        Ok(types::shape_trophies(list))
    }

    async fn subreddit_posts(
        &self,
        token: &str,
        subreddit: &str,
        page: &Page,
    ) -> Result<Vec<PostSummary>, RedditError> {
        let path = ["r", subreddit, page.sort.as_str()];
        let listing: Listing<RawPost> = self.get_json(token, &path, &page_query(page)).await?;
        Ok(types::shape_subreddit_posts(listing))
    }

    async fn user_posts(&self, token: &str, username: &str) -> Result<Vec<UserPost>, RedditError> {
        let path = ["user", username, "submitted"];
        let listing: Listing<RawPost> = self.get_json(token, &path, &[]).await?;
        Ok(types::shape_user_posts(listing))
    }

    async fn user_comments(
        &self,
        token: &str,
        username: &str,
    ) -> Result<Vec<UserComment>, RedditError> {
        let path = ["user", username, "comments"];
        let listing: Listing<RawComment> = self.get_json(token, &path, &[]).await?;
        Ok(types::shape_user_comments(listing))
    }

    async fn search(
        &self,
        token: &str,
        query: &str,
        subreddit: Option<&str>,
        page: &Page,
    ) -> Result<Vec<SearchResult>, RedditError> {
        let mut params = vec![
            ("q", query.to_string()),
            ("sort", page.sort.as_str().to_string()),
        ];
        params.extend(page_query(page));

        let path: Vec<&str> = match subreddit {
            Some(sr) => {
                params.push(("restrict_sr", "1".to_string()));
                vec!["r", sr, "search"]
            }
            None => vec!["search"],
        };

        let listing: Listing<RawPost> = self.get_json(token, &path, &params).await?;
        Ok(types::shape_search_results(listing))
    }

    async fn submit_post(
        &self,
        token: &str,
        post: &NewPost,
    ) -> Result<SubmissionResult, RedditError> {
        let form = [
            ("api_type", "json".to_string()),
            ("sr", post.subreddit.clone()),
            ("title", post.title.clone()),
            ("kind", "self".to_string()),
            ("text", post.text.clone()),
            ("nsfw", post.nsfw.to_string()),
            ("spoiler", post.spoiler.to_string()),
        ];
        let envelope: RawJsonEnvelope = self.post_form(token, &["api", "submit"], &form).await?;
        Ok(types::shape_submission(envelope))
    }

    async fn submit_comment(
        &self,
        token: &str,
        thing_id: &str,
        text: &str,
    ) -> Result<SubmissionResult, RedditError> {
        let form = [
            ("api_type", "json".to_string()),
            ("thing_id", thing_id.to_string()),
            ("text", text.to_string()),
        ];
        let envelope: RawJsonEnvelope = self.post_form(token, &["api", "comment"], &form).await?;
        Ok(types::shape_submission(envelope))
    }

    async fn vote(
        &self,
        token: &str,
        thing_id: &str,
        direction: VoteDirection,
    ) -> Result<SubmissionResult, RedditError> {
        let form = [
            ("id", thing_id.to_string()),
            ("dir", direction.as_dir().to_string()),
        ];
        // Success is an empty object.
        let _: serde_json::Value = self.post_form(token, &["api", "vote"], &form).await?;
        Ok(SubmissionResult {
            success: true,
            id: None,
            name: Some(thing_id.to_string()),
            url: None,
            errors: Vec::new(),
        })
    }

    async fn post_comments(
        &self,
        token: &str,
        subreddit: &str,
        post_id: &str,
        page: &Page,
    ) -> Result<Vec<PostComment>, RedditError> {
        let article = post_id.strip_prefix("t3_").unwrap_or(post_id);
        let path = ["r", subreddit, "comments", article];
        let mut params = vec![("sort", page.sort.as_str().to_string()), ("depth", "1".to_string())];
        params.extend(page_query(page));

        let listings: Vec<Listing<RawComment>> = self.get_json(token, &path, &params).await?;
        Ok(types::shape_post_comments(listings))
    }

    async fn subscribed_subreddits(
        &self,
        token: &str,
        limit: u32,
    ) -> Result<Vec<SubscribedSubreddit>, RedditError> {
        let listing: Listing<RawSubreddit> = self
            .get_json(
                token,
                &["subreddits", "mine", "subscriber"],
                &[("limit", limit.to_string())],
            )
            .await?;
        Ok(types::shape_subscribed(listing))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RedditConfig {
        serde_yaml::from_str(
            r#"
            client_id: "cid"
            redirect_uri: "http://localhost:3000/callback"
            state: "s"
            api_base_url: "http://127.0.0.1:9/"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_api_url_joins_segments_onto_base() {
        let client = RedditClient::from_config(&config()).unwrap();
        assert_eq!(
            client.api_url(&["api", "v1", "me"]).unwrap().as_str(),
            "http://127.0.0.1:9/api/v1/me"
        );
    }

    #[test]
    fn test_api_url_encodes_each_segment() {
        let client = RedditClient::from_config(&config()).unwrap();
        let url = client
            .api_url(&["r", "rust/../../api/v1/me/prefs?x=", "hot"])
            .unwrap();
        assert_eq!(url.path(), "/r/rust%2F..%2F..%2Fapi%2Fv1%2Fme%2Fprefs%3Fx=/hot");
        assert!(url.query().is_none());

        let dots = client.api_url(&["r", "..", "hot"]).unwrap();
        assert!(dots.path().starts_with("/r/"));
    }

    #[test]
    fn test_invalid_api_base_is_config_error() {
        let mut cfg = config();
        cfg.api_base_url = "not a url".into();
        assert!(matches!(
            RedditClient::from_config(&cfg),
            Err(RedditError::Config { .. })
        ));
    }

    #[test]
    fn test_page_query_omits_missing_after() {
        let q = page_query(&Page::default());
        assert_eq!(q, vec![("limit", "10".to_string())]);

        let q = page_query(&Page {
            after: Some("t3_x".into()),
            limit: 5,
            ..Page::default()
        });
        assert_eq!(q[1], ("after", "t3_x".to_string()));
    }

    #[test]
    fn test_floor_char_boundary() {
        assert_eq!(floor_char_boundary("abc", 10), 3);
        assert_eq!(floor_char_boundary("aé", 2), 1);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_error() {
        let client = RedditClient::from_config(&config()).unwrap();
        let err = client.karma("tok").await.unwrap_err();
        assert!(matches!(
            err,
            RedditError::Connection { .. } | RedditError::Timeout { .. }
        ));
        assert!(!err.is_unauthorized());
    }
}
