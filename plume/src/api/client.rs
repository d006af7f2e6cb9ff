use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::{ApiError, ApiResult, PostGateway};
use plume_types::*;

/// HTTP implementation of the post gateway
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpGateway {
    /// Create a new gateway without a request timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: trim_base_url(base_url.into()),
            session_token: None,
        }
    }

    /// Create a gateway whose requests fail after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: trim_base_url(base_url.into()),
            session_token: None,
        })
    }

    /// Set the session token for authenticated requests
    pub fn set_session_token(&mut self, token: Option<String>) {
        self.session_token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn add_auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.session_token {
            req.header("X-Session-Token", token)
        } else {
            req
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn handle_empty_response(&self, response: reqwest::Response) -> ApiResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let clean_error = error_message(status.as_u16(), error_text);

        match status.as_u16() {
            404 => ApiError::NotFound(clean_error),
            401 => ApiError::Unauthorized(clean_error),
            400 => ApiError::BadRequest(clean_error),
            _ => ApiError::Api(clean_error),
        }
    }
}

// HTML bodies come from proxies, not from the API
fn error_message(status: u16, body: String) -> String {
    if body.contains("<html>") || body.contains("<!DOCTYPE") {
        return format!("Server returned {} error. Please check the server URL.", status);
    }
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(ErrorResponse {
            error,
            details: Some(details),
        }) => format!("{}: {}", error, details),
        Ok(ErrorResponse { error, .. }) => error,
        Err(_) => body,
    }
}

#[async_trait]
impl PostGateway for HttpGateway {
    async fn fetch_page(&self, page: u32, scope_user_id: Option<UserId>) -> ApiResult<PostPage> {
        let url = page_url(&self.base_url, page, scope_user_id);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn fetch_post(&self, id: PostId) -> ApiResult<Post> {
        let url = format!("{}/posts/{}", self.base_url, id);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn fetch_user_reaction(&self, post_id: PostId) -> ApiResult<Option<ReactionType>> {
        let url = format!("{}/posts/{}/reaction", self.base_url, post_id);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        let reaction: UserReactionResponse = self.handle_response(response).await?;
        Ok(reaction.reaction_type)
    }

    async fn create(&self, draft: PostDraft) -> ApiResult<Post> {
        let url = format!("{}/posts", self.base_url);
        let req = self.add_auth_header(self.client.post(&url).json(&draft));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn update(&self, id: PostId, patch: PostPatch) -> ApiResult<PostFields> {
        let url = format!("{}/posts/{}", self.base_url, id);
        let req = self.add_auth_header(self.client.put(&url).json(&patch));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn delete(&self, id: PostId) -> ApiResult<()> {
        let url = format!("{}/posts/{}", self.base_url, id);
        let req = self.add_auth_header(self.client.delete(&url));
        let response = req.send().await?;
        self.handle_empty_response(response).await
    }

    async fn toggle_reaction(&self, id: PostId, reaction: ReactionType) -> ApiResult<ReactionOutcome> {
        let url = format!("{}/posts/{}/reactions", self.base_url, id);
        let request = ToggleReactionRequest {
            reaction_type: reaction,
        };
        let req = self.add_auth_header(self.client.post(&url).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn add_comment(
        &self,
        post_id: PostId,
        content: String,
        parent_comment_id: Option<CommentId>,
    ) -> ApiResult<Comment> {
        let url = format!("{}/posts/{}/comments", self.base_url, post_id);
        let request = AddCommentRequest {
            content,
            parent_comment_id,
        };
        let req = self.add_auth_header(self.client.post(&url).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn delete_comment(&self, post_id: PostId, comment_id: CommentId) -> ApiResult<()> {
        let url = format!("{}/posts/{}/comments/{}", self.base_url, post_id, comment_id);
        let req = self.add_auth_header(self.client.delete(&url));
        let response = req.send().await?;
        self.handle_empty_response(response).await
    }

    async fn search(&self, query: &str, page: u32) -> ApiResult<PostPage> {
        let url = format!(
            "{}/posts/search?q={}&page={}",
            self.base_url,
            urlencoding::encode(query),
            page
        );
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }
}

fn trim_base_url(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

fn page_url(base_url: &str, page: u32, scope_user_id: Option<UserId>) -> String {
    let mut url = format!("{}/posts?page={}", base_url, page);
    if let Some(user_id) = scope_user_id {
        url.push_str("&user_id=");
        url.push_str(&urlencoding::encode(&user_id.to_string()));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let gateway = HttpGateway::new("https://feed.example/api/");
        assert_eq!(gateway.base_url(), "https://feed.example/api");
    }

    #[test]
    fn test_page_url_without_scope() {
        assert_eq!(page_url("http://h", 2, None), "http://h/posts?page=2");
    }

    #[test]
    fn test_page_url_with_scope() {
        let user = Uuid::from_u128(1);
        assert_eq!(
            page_url("http://h", 0, Some(user)),
            format!("http://h/posts?page=0&user_id={}", user)
        );
    }

    #[test]
    fn test_error_message_reads_error_body() {
        let body = r#"{"error":"Post not found","details":null}"#.to_string();
        assert_eq!(error_message(404, body), "Post not found");

        let body = r#"{"error":"Validation failed","details":"content too long"}"#.to_string();
        assert_eq!(
            error_message(400, body),
            "Validation failed: content too long"
        );
    }

    #[test]
    fn test_error_message_hides_proxy_html() {
        let body = "<!DOCTYPE html><html><body>Bad Gateway</body></html>".to_string();
        assert_eq!(
            error_message(502, body),
            "Server returned 502 error. Please check the server URL."
        );
    }

    #[test]
    fn test_error_message_keeps_plain_text() {
        assert_eq!(error_message(500, "boom".to_string()), "boom");
    }
}
