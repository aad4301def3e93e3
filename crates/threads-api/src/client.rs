//! Threads API façade
//!
//! Every call reads the live credential from the shared `TokenManager` and
//! runs through `TokenManager::ensure_valid`, so an expired token is refreshed
//! and the call retried once. `retrieve_profile` doubles as the identity probe
//! after construction and after a refresh.

use std::sync::Arc;

use threads_auth::{Credential, GRAPH_BASE_URL, TokenManager};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::poll::{PollSettings, TokioWaiter, Waiter};
use crate::request::{get_json, post_form};
use crate::types::{
    Container, ContainerStatus, DataResponse, IdResponse, InsightMetric, MediaType,
    MetricsSnapshot, PostSnapshot, Profile, PublishedPost, StatusResponse,
};
use crate::workflow::{ApiFuture, PublishApi, PublishWorkflow};

/// Fields requested for the account profile
pub const PROFILE_FIELDS: &str = "id,username,threads_profile_picture_url,threads_biography";

/// Fields requested when reading back a post
pub const POST_FIELDS: &str =
    "id,text,likes_count,replies_count,retweets_count,created_at,permalink";

/// Metrics requested from the insights endpoint
pub const INSIGHT_METRICS: &str = "views,likes,replies,reposts,quotes,followers_count";

/// Maximum post length accepted by the API
pub const MAX_TEXT_CHARS: usize = 500;

pub struct ThreadsClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    poll: PollSettings,
    waiter: Arc<dyn Waiter>,
}

impl ThreadsClient {
    /// Client against the production graph host with default poll settings.
    pub fn new(http: reqwest::Client, tokens: Arc<TokenManager>) -> Self {
        Self {
            http,
            base_url: GRAPH_BASE_URL.to_string(),
            tokens,
            poll: PollSettings::default(),
            waiter: Arc::new(TokioWaiter),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_waiter(mut self, waiter: Arc<dyn Waiter>) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Confirm the credential works by fetching the account profile.
    pub async fn verify(&self) -> Result<Profile> {
        let profile = self.retrieve_profile().await?;
        info!(user_id = %profile.id, username = %profile.username, "credential verified");
        Ok(profile)
    }

    /// Refresh the credential, then confirm the new one works.
    ///
    /// The caller is responsible for persisting the returned credential.
    pub async fn refresh_credential(&self) -> Result<(Credential, Profile)> {
        let credential = self.tokens.refresh().await?;
        let profile = self.verify().await?;
        Ok((credential, profile))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    #[instrument(skip(self))]
    pub async fn retrieve_profile(&self) -> Result<Profile> {
        let url = &self.url("me");
        self.tokens
            .ensure_valid(move || async move {
                let credential = self.tokens.current_credential();
                get_json(&self.http, url, credential.token(), &[("fields", PROFILE_FIELDS)]).await
            })
            .await
    }

    /// Create a media container. The returned container's status is
    /// `Unknown` until it is polled.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn create_container(&self, text: &str, image_url: Option<&str>) -> Result<Container> {
        validate_post(text, image_url)?;
        let url = &self.url("me/threads");
        let fields = &container_fields(text, image_url);

        let created: IdResponse = self
            .tokens
            .ensure_valid(move || async move {
                let credential = self.tokens.current_credential();
                post_form(&self.http, url, credential.token(), fields).await
            })
            .await?;

        Ok(Container {
            id: created.id,
            text: text.to_string(),
            image_url: image_url.map(str::to_string),
            media_type: media_type_for(image_url),
            status: ContainerStatus::Unknown,
        })
    }

    /// Single status check. Missing or unrecognized values map to `Unknown`.
    #[instrument(skip(self))]
    pub async fn poll_status(&self, container_id: &str) -> Result<ContainerStatus> {
        let url = &self.url(container_id);
        let response: StatusResponse = self
            .tokens
            .ensure_valid(move || async move {
                let credential = self.tokens.current_credential();
                get_json(&self.http, url, credential.token(), &[("fields", "status")]).await
            })
            .await?;
        Ok(ContainerStatus::from_wire(
            response.status.as_ref().and_then(|v| v.as_str()),
        ))
    }

    /// Publish a container. The API rejects containers that are not ready.
    #[instrument(skip(self))]
    pub async fn publish(&self, container_id: &str) -> Result<PublishedPost> {
        let url = &self.url("me/threads_publish");
        let fields = &[("creation_id", container_id.to_string())];
        self.tokens
            .ensure_valid(move || async move {
                let credential = self.tokens.current_credential();
                post_form(&self.http, url, credential.token(), fields).await
            })
            .await
    }

    /// Create, poll until publishable, and publish.
    pub async fn post_thread(&self, text: &str, image_url: Option<&str>) -> Result<PublishedPost> {
        self.post_thread_cancellable(text, image_url, CancellationToken::new())
            .await
    }

    /// `post_thread` that stops polling with `Error::Cancelled` once `cancel`
    /// fires.
    #[instrument(skip(self, text, cancel))]
    pub async fn post_thread_cancellable(
        &self,
        text: &str,
        image_url: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<PublishedPost> {
        PublishWorkflow::new(self, self.waiter.as_ref(), self.poll.clone())
            .with_cancellation(cancel)
            .run(text, image_url)
            .await
    }

    /// Read back a post by media id. The id is a filter the API applies
    /// server-side; the entry matching `media_id` is returned.
    #[instrument(skip(self))]
    pub async fn retrieve_post(&self, media_id: &str) -> Result<PostSnapshot> {
        let url = &self.url("me/threads");
        let response: DataResponse<PostSnapshot> = self
            .tokens
            .ensure_valid(move || async move {
                let credential = self.tokens.current_credential();
                get_json(
                    &self.http,
                    url,
                    credential.token(),
                    &[("fields", POST_FIELDS), ("id", media_id)],
                )
                .await
            })
            .await?;

        response
            .data
            .into_iter()
            .find(|post| post.id == media_id)
            .ok_or_else(|| Error::PostNotFound {
                media_id: media_id.to_string(),
            })
    }

    #[instrument(skip(self))]
    pub async fn retrieve_insights(&self, user_id: &str) -> Result<MetricsSnapshot> {
        let url = &self.url(&format!("{user_id}/threads_insights"));
        let response: DataResponse<InsightMetric> = self
            .tokens
            .ensure_valid(move || async move {
                let credential = self.tokens.current_credential();
                get_json(
                    &self.http,
                    url,
                    credential.token(),
                    &[("metric", INSIGHT_METRICS)],
                )
                .await
            })
            .await?;
        Ok(MetricsSnapshot::from_metrics(&response.data))
    }
}

impl PublishApi for ThreadsClient {
    fn create_container<'a>(
        &'a self,
        text: &'a str,
        image_url: Option<&'a str>,
    ) -> ApiFuture<'a, Container> {
        Box::pin(ThreadsClient::create_container(self, text, image_url))
    }

    fn poll_status<'a>(&'a self, container_id: &'a str) -> ApiFuture<'a, ContainerStatus> {
        Box::pin(ThreadsClient::poll_status(self, container_id))
    }

    fn publish<'a>(&'a self, container_id: &'a str) -> ApiFuture<'a, PublishedPost> {
        Box::pin(ThreadsClient::publish(self, container_id))
    }
}

fn media_type_for(image_url: Option<&str>) -> MediaType {
    match image_url {
        Some(_) => MediaType::Image,
        None => MediaType::Text,
    }
}

/// Form fields for container creation (without the token).
pub(crate) fn container_fields(text: &str, image_url: Option<&str>) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("text", text.to_string()),
        ("media_type", media_type_for(image_url).as_str().to_string()),
    ];
    if let Some(image_url) = image_url {
        fields.push(("image_url", image_url.to_string()));
    }
    fields
}

fn validate_post(text: &str, image_url: Option<&str>) -> Result<()> {
    if text.trim().is_empty() && image_url.is_none() {
        return Err(Error::InvalidRequest(
            "a text post needs non-empty text".into(),
        ));
    }
    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(Error::InvalidRequest(format!(
            "text is {chars} characters, the limit is {MAX_TEXT_CHARS}"
        )));
    }
    if let Some(image_url) = image_url {
        if !image_url.starts_with("https://") && !image_url.starts_with("http://") {
            return Err(Error::InvalidRequest(format!(
                "image_url must be an http(s) URL, got: {image_url}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct InstantWaiter;

    impl Waiter for InstantWaiter {
        fn wait(&self, _interval: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            Box::pin(async {})
        }
    }

    fn client(server: &MockServer) -> ThreadsClient {
        client_with_token(server, "tok", true)
    }

    fn client_with_token(server: &MockServer, token: &str, auto_refresh: bool) -> ThreadsClient {
        let http = reqwest::Client::new();
        let tokens = TokenManager::new(http.clone(), Credential::new(token))
            .with_refresh_endpoint(format!("{}/refresh_access_token", server.uri()))
            .with_auto_refresh(auto_refresh);
        ThreadsClient::new(http, Arc::new(tokens))
            .with_base_url(format!("{}/v1.0", server.uri()))
            .with_waiter(Arc::new(InstantWaiter))
    }

    fn expired_body() -> serde_json::Value {
        serde_json::json!({
            "error": {
                "message": "Error validating access token: Session has expired",
                "type": "OAuthException",
                "code": 190,
                "error_subcode": 463
            }
        })
    }

    #[test]
    fn text_container_has_no_image_field() {
        let fields = container_fields("hello", None);
        assert_eq!(
            fields,
            vec![
                ("text", "hello".to_string()),
                ("media_type", "TEXT".to_string())
            ]
        );
    }

    #[test]
    fn image_container_sets_media_type_and_url() {
        let fields = container_fields("look", Some("https://cdn.example/cat.jpg"));
        assert!(fields.contains(&("media_type", "IMAGE".to_string())));
        assert!(fields.contains(&("image_url", "https://cdn.example/cat.jpg".to_string())));
    }

    #[test]
    fn validation_rejects_bad_posts() {
        assert!(validate_post("", None).is_err());
        assert!(validate_post("   ", None).is_err());
        assert!(validate_post(&"x".repeat(MAX_TEXT_CHARS + 1), None).is_err());
        assert!(validate_post("hi", Some("ftp://nope")).is_err());
        assert!(validate_post("", Some("https://cdn.example/a.png")).is_ok());
        assert!(validate_post(&"x".repeat(MAX_TEXT_CHARS), None).is_ok());
    }

    #[tokio::test]
    async fn retrieve_profile_uses_bearer_and_fixed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me"))
            .and(header("authorization", "Bearer tok"))
            .and(query_param("fields", PROFILE_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1789",
                "username": "hello.world",
                "threads_profile_picture_url": "https://cdn.example/p.jpg",
                "threads_biography": "bio"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client(&server).retrieve_profile().await.unwrap();
        assert_eq!(profile.id, "1789");
        assert_eq!(profile.biography.as_deref(), Some("bio"));
    }

    #[tokio::test]
    async fn create_text_container_posts_form_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("media_type=TEXT"))
            .and(body_string_contains("text=hello"))
            .and(body_string_contains("access_token=tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "123"})))
            .expect(1)
            .mount(&server)
            .await;

        let container = client(&server)
            .create_container("hello", None)
            .await
            .unwrap();

        assert_eq!(container.id, "123");
        assert_eq!(container.media_type, MediaType::Text);
        assert_eq!(container.status, ContainerStatus::Unknown);
        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(!body.contains("image_url"), "got: {body}");
    }

    #[tokio::test]
    async fn create_image_container_includes_image_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads"))
            .and(body_string_contains("media_type=IMAGE"))
            .and(body_string_contains("image_url=https%3A%2F%2Fcdn.example%2Fcat.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "124"})))
            .expect(1)
            .mount(&server)
            .await;

        let container = client(&server)
            .create_container("look", Some("https://cdn.example/cat.jpg"))
            .await
            .unwrap();
        assert_eq!(container.media_type, MediaType::Image);
        assert_eq!(
            container.image_url.as_deref(),
            Some("https://cdn.example/cat.jpg")
        );
    }

    #[tokio::test]
    async fn poll_status_maps_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/123"))
            .and(query_param("fields", "status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "FINISHED", "id": "123"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/999"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "999"})))
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(
            client.poll_status("123").await.unwrap(),
            ContainerStatus::Finished
        );
        assert_eq!(
            client.poll_status("999").await.unwrap(),
            ContainerStatus::Unknown
        );
    }

    #[tokio::test]
    async fn publish_sends_creation_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads_publish"))
            .and(body_string_contains("creation_id=123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "456"})))
            .expect(1)
            .mount(&server)
            .await;

        let post = client(&server).publish("123").await.unwrap();
        assert_eq!(post, PublishedPost { id: "456".into() });
    }

    #[tokio::test]
    async fn post_thread_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "123"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "FINISHED"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads_publish"))
            .and(body_string_contains("creation_id=123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "456"})))
            .expect(1)
            .mount(&server)
            .await;

        let post = client(&server).post_thread("hello", None).await.unwrap();
        assert_eq!(post, PublishedPost { id: "456".into() });
    }

    #[tokio::test]
    async fn post_thread_polls_through_in_progress() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "123"})))
            .mount(&server)
            .await;
        // Served first until exhausted, then the FINISHED mock takes over
        Mock::given(method("GET"))
            .and(path("/v1.0/123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "IN_PROGRESS"})),
            )
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "FINISHED"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads_publish"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "456"})))
            .expect(1)
            .mount(&server)
            .await;

        let post = client(&server).post_thread("hello", None).await.unwrap();
        assert_eq!(post.id, "456");
    }

    #[tokio::test]
    async fn post_thread_error_status_never_publishes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "123"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ERROR"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads_publish"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "456"})))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).post_thread("hello", None).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ContainerUnpublishable {
                status: ContainerStatus::Error,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn non_success_preserves_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads_publish"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "Media not ready", "type": "THApiException", "code": 24}
            })))
            .mount(&server)
            .await;

        let err = client(&server).publish("123").await.unwrap_err();
        match err {
            Error::HttpStatus {
                method,
                url,
                status,
                body,
            } => {
                assert_eq!(method, reqwest::Method::POST);
                assert!(url.ends_with("/v1.0/me/threads_publish"));
                assert_eq!(status, 400);
                assert_eq!(body.graph_error().unwrap().message, "Media not ready");
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_success_preserves_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = client(&server).retrieve_profile().await.unwrap_err();
        assert!(matches!(
            err,
            Error::HttpStatus { status: 502, body: crate::ErrorBody::Text(ref t), .. } if t == "upstream down"
        ));
    }

    #[tokio::test]
    async fn transport_failure_names_method_and_url() {
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenManager::new(http.clone(), Credential::new("tok")));
        let client = ThreadsClient::new(http, tokens).with_base_url("http://127.0.0.1:9/v1.0");

        let err = client.retrieve_profile().await.unwrap_err();
        match err {
            Error::Transport { method, url, .. } => {
                assert_eq!(method, reqwest::Method::GET);
                assert_eq!(url, "http://127.0.0.1:9/v1.0/me");
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_call_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me"))
            .and(header("authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(401).set_body_json(expired_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/refresh_access_token"))
            .and(query_param("access_token", "old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new", "token_type": "bearer", "expires_in": 5183944
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me"))
            .and(header("authorization", "Bearer new"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "1", "username": "u"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_token(&server, "old", true);
        let mut updates = client.tokens().subscribe();

        let profile = client.retrieve_profile().await.unwrap();

        assert_eq!(profile.id, "1");
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().token(), "new");
    }

    #[tokio::test]
    async fn expired_form_call_retries_with_new_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads_publish"))
            .and(body_string_contains("access_token=old"))
            .respond_with(ResponseTemplate::new(401).set_body_json(expired_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/refresh_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new", "expires_in": 60
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1.0/me/threads_publish"))
            .and(body_string_contains("access_token=new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "456"})))
            .expect(1)
            .mount(&server)
            .await;

        let post = client_with_token(&server, "old", true)
            .publish("123")
            .await
            .unwrap();
        assert_eq!(post.id, "456");
    }

    #[tokio::test]
    async fn expired_token_without_auto_refresh_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(expired_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/refresh_access_token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_with_token(&server, "old", false)
            .retrieve_profile()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(threads_auth::Error::CredentialExpired)
        ));
    }

    #[tokio::test]
    async fn unauthorized_without_expiry_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Missing permission", "type": "GraphMethodException", "code": 10}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/refresh_access_token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).retrieve_profile().await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
    }

    #[tokio::test]
    async fn refresh_credential_probes_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/refresh_access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new", "expires_in": 5183944
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me"))
            .and(header("authorization", "Bearer new"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "1", "username": "u"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (credential, profile) = client(&server).refresh_credential().await.unwrap();
        assert_eq!(credential.token(), "new");
        assert_eq!(profile.username, "u");
    }

    #[tokio::test]
    async fn retrieve_post_filters_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/threads"))
            .and(query_param("fields", POST_FIELDS))
            .and(query_param("id", "101"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "100", "text": "older"},
                    {"id": "101", "text": "Hello World!", "likes_count": 2, "replies_count": 0,
                     "retweets_count": 1, "created_at": "2023-05-25T00:00:00Z",
                     "permalink": "https://www.threads.net/@u/post/abc"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let post = client.retrieve_post("101").await.unwrap();
        assert_eq!(post.text.as_deref(), Some("Hello World!"));
        assert_eq!(post.like_count, Some(2));
        assert_eq!(post.repost_count, Some(1));

    }

    #[tokio::test]
    async fn retrieve_post_without_matching_entry_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/threads"))
            .and(query_param("id", "102"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": "100", "text": "older"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/me/threads"))
            .and(query_param("id", "103"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let mismatched = client.retrieve_post("102").await.unwrap_err();
        assert!(
            matches!(mismatched, Error::PostNotFound { ref media_id } if media_id == "102"),
            "got: {mismatched:?}"
        );
        let empty = client.retrieve_post("103").await.unwrap_err();
        assert!(
            matches!(empty, Error::PostNotFound { ref media_id } if media_id == "103"),
            "got: {empty:?}"
        );
    }

    #[tokio::test]
    async fn retrieve_insights_requests_fixed_metrics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/1789/threads_insights"))
            .and(query_param("metric", INSIGHT_METRICS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"name": "views", "period": "day", "values": [{"value": 4}, {"value": 6}]},
                    {"name": "likes", "period": "day", "total_value": {"value": 3}},
                    {"name": "replies", "period": "day", "total_value": {"value": 1}},
                    {"name": "reposts", "period": "day", "total_value": {"value": 0}},
                    {"name": "quotes", "period": "day", "total_value": {"value": 2}},
                    {"name": "followers_count", "period": "day", "total_value": {"value": 99}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let metrics = client(&server).retrieve_insights("1789").await.unwrap();
        assert_eq!(
            metrics,
            MetricsSnapshot {
                views: Some(10),
                likes: Some(3),
                replies: Some(1),
                reposts: Some(0),
                quotes: Some(2),
                followers_count: Some(99),
            }
        );
    }

    #[tokio::test]
    async fn malformed_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).retrieve_profile().await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }), "got: {err:?}");
    }
}
