//! Publish service client.
//!
//! The publisher is a small HTTP API in front of a Discord bot. New posts are
//! sent as `POST <endpoint>` and updates as
//! `PATCH <endpoint>/<threadId>/<messageId>`, both as multipart forms.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};

use crate::config::ApiConfig;

use super::types::{EditTarget, PublishError, PublishRequest, PublishResponse, PublishResult};

const API_KEY_HEADER: &str = "X-API-KEY";

/// Remote publisher.
#[async_trait]
pub trait PublishService: Send + Sync {
    /// Send a post; `target` selects update mode
    async fn publish(
        &self,
        endpoint: &str,
        api_key: Option<&str>,
        request: PublishRequest,
        target: Option<&EditTarget>,
    ) -> PublishResult<PublishResponse>;

    /// Check that the endpoint answers, returning the HTTP status
    async fn check_connection(&self, endpoint: &str, api_key: Option<&str>) -> PublishResult<u16>;
}

/// `PublishService` over HTTP using reqwest.
#[derive(Debug, Clone)]
pub struct HttpPublishService {
    http: Client,
}

impl HttpPublishService {
    pub fn new(timeout: Duration) -> PublishResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Transport(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    pub fn from_settings(settings: &ApiConfig) -> PublishResult<Self> {
        Self::new(Duration::from_secs(settings.timeout_seconds))
    }

    /// Multipart body for a post.
    ///
    /// Images whose MIME type cannot be announced are left out; parts stay
    /// numbered `image_0..n` over the images actually sent.
    fn build_form(request: PublishRequest) -> Form {
        let mut form = Form::new()
            .text("title", request.title)
            .text("content", request.content)
            .text("tags", request.tags)
            .text("template", request.template_kind.as_str().to_string());

        let mut sent = 0;
        let mut main_index = None;
        for image in request.images {
            let part = match Part::bytes(image.bytes)
                .file_name(image.filename.clone())
                .mime_str(&image.mime)
            {
                Ok(part) => part,
                Err(e) => {
                    tracing::warn!(
                        file = %image.filename,
                        mime = %image.mime,
                        error = %e,
                        "Skipping image with invalid type"
                    );
                    continue;
                }
            };
            if image.is_main && main_index.is_none() {
                main_index = Some(sent);
            }
            form = form.part(format!("image_{}", sent), part);
            sent += 1;
        }

        if let Some(index) = main_index {
            form = form.text("main_image_index", index.to_string());
        }
        form
    }
}

/// URL and method for a create or an update
fn target_url(endpoint: &str, target: Option<&EditTarget>) -> (Method, String) {
    match target {
        Some(t) => (
            Method::PATCH,
            format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                t.thread_id,
                t.message_id
            ),
        ),
        None => (Method::POST, endpoint.to_string()),
    }
}

/// Message for a non-2xx response: the JSON `error` field, else the body,
/// else the status line.
fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            if !error.is_empty() {
                return error.to_string();
            }
        }
    }
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body.to_string()
    }
}

fn transport(e: reqwest::Error) -> PublishError {
    PublishError::Transport(e.to_string())
}

#[async_trait]
impl PublishService for HttpPublishService {
    async fn publish(
        &self,
        endpoint: &str,
        api_key: Option<&str>,
        request: PublishRequest,
        target: Option<&EditTarget>,
    ) -> PublishResult<PublishResponse> {
        let (method, url) = target_url(endpoint, target);
        let form = Self::build_form(request);

        let mut builder = self.http.request(method.clone(), &url).multipart(form);
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            builder = builder.header(API_KEY_HEADER, key);
        }

        tracing::debug!(method = %method, url = %url, "Sending post to publisher");
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::warn!(status = status.as_u16(), error = %message, "Publisher rejected post");
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(PublishResponse::default());
        }
        match serde_json::from_str(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                tracing::warn!(error = %e, "Publisher response is not JSON, ignoring body");
                Ok(PublishResponse::default())
            }
        }
    }

    async fn check_connection(&self, endpoint: &str, api_key: Option<&str>) -> PublishResult<u16> {
        if endpoint.trim().is_empty() {
            return Err(PublishError::MissingEndpoint);
        }

        let mut builder = self.http.get(endpoint);
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let status = builder.send().await.map_err(transport)?.status();
        // 404 and 405 still prove the server is up
        if status.is_success()
            || status == StatusCode::NOT_FOUND
            || status == StatusCode::METHOD_NOT_ALLOWED
        {
            Ok(status.as_u16())
        } else {
            Err(PublishError::Rejected {
                status: status.as_u16(),
                message: format!("HTTP {}", status.as_u16()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::types::ImageAttachment;
    use crate::template::TemplateKind;
    use mockito::Matcher;

    fn service() -> HttpPublishService {
        HttpPublishService::new(Duration::from_secs(5)).unwrap()
    }

    fn request(images: Vec<ImageAttachment>) -> PublishRequest {
        PublishRequest {
            title: "Lost Solace".to_string(),
            content: "## Lost Solace".to_string(),
            tags: "rpg,fr".to_string(),
            template_kind: TemplateKind::My,
            images,
        }
    }

    #[test]
    fn test_target_url() {
        let (method, url) = target_url("https://api.example/forum-post", None);
        assert_eq!(method, Method::POST);
        assert_eq!(url, "https://api.example/forum-post");

        let target = EditTarget {
            thread_id: "111".to_string(),
            message_id: "222".to_string(),
        };
        let (method, url) = target_url("https://api.example/forum-post/", Some(&target));
        assert_eq!(method, Method::PATCH);
        assert_eq!(url, "https://api.example/forum-post/111/222");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"error":"missing title"}"#),
            "missing title"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(error_message(StatusCode::INTERNAL_SERVER_ERROR, ""), "HTTP 500");
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"detail":"x"}"#),
            r#"{"detail":"x"}"#
        );
    }

    #[tokio::test]
    async fn test_publish_posts_multipart_with_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/forum-post")
            .match_header("x-api-key", "secret")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="title""#.to_string()),
                Matcher::Regex("Lost Solace".to_string()),
                Matcher::Regex(r#"name="template""#.to_string()),
                Matcher::Regex(r#"name="image_0"; filename="cover.png""#.to_string()),
                Matcher::Regex(r#"name="main_image_index""#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"thread_id":"111","message_id":"222","thread_url":"https://discord.com/channels/1/111","forum_id":5}"#)
            .create_async()
            .await;

        let image = ImageAttachment {
            filename: "cover.png".to_string(),
            mime: "image/png".to_string(),
            bytes: b"PNGDATA".to_vec(),
            is_main: true,
        };
        let endpoint = format!("{}/api/forum-post", server.url());
        let response = service()
            .publish(&endpoint, Some("secret"), request(vec![image]), None)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.ids(), Some(("111", "222")));
        assert_eq!(response.link(), Some("https://discord.com/channels/1/111"));
        assert_eq!(response.forum_id, Some(5));
    }

    #[tokio::test]
    async fn test_image_with_invalid_type_is_left_out() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/forum-post")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="image_0"; filename="shot.png""#.to_string()),
                Matcher::Regex(r#"name="main_image_index"\r\n\r\n0\r\n"#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"thread_id":"111","message_id":"222"}"#)
            .expect(1)
            .create_async()
            .await;

        let images = vec![
            ImageAttachment {
                filename: "cover.jpé".to_string(),
                mime: "image/jpé".to_string(),
                bytes: b"COVER".to_vec(),
                is_main: false,
            },
            ImageAttachment {
                filename: "shot.png".to_string(),
                mime: "image/png".to_string(),
                bytes: b"SHOT".to_vec(),
                is_main: true,
            },
        ];
        let endpoint = format!("{}/api/forum-post", server.url());
        let response = service()
            .publish(&endpoint, None, request(images), None)
            .await
            .unwrap();

        assert_eq!(response.ids(), Some(("111", "222")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_publish_update_uses_patch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/api/forum-post/111/222")
            .match_header("x-api-key", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let target = EditTarget {
            thread_id: "111".to_string(),
            message_id: "222".to_string(),
        };
        let endpoint = format!("{}/api/forum-post", server.url());
        let response = service()
            .publish(&endpoint, None, request(Vec::new()), Some(&target))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response, PublishResponse::default());
    }

    #[tokio::test]
    async fn test_publish_rejected_reports_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(401)
            .with_body(r#"{"error":"invalid api key"}"#)
            .create_async()
            .await;

        let err = service()
            .publish(&server.url(), Some("wrong"), request(Vec::new()), None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PublishError::Rejected {
                status: 401,
                message: "invalid api key".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_check_connection_statuses() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/ok").with_status(200).create_async().await;
        server.mock("GET", "/post-only").with_status(405).create_async().await;
        server.mock("GET", "/broken").with_status(503).create_async().await;

        let service = service();
        assert_eq!(
            service
                .check_connection(&format!("{}/ok", server.url()), None)
                .await
                .unwrap(),
            200
        );
        assert_eq!(
            service
                .check_connection(&format!("{}/post-only", server.url()), None)
                .await
                .unwrap(),
            405
        );
        assert!(matches!(
            service
                .check_connection(&format!("{}/broken", server.url()), None)
                .await,
            Err(PublishError::Rejected { status: 503, .. })
        ));
        assert_eq!(
            service.check_connection("  ", None).await,
            Err(PublishError::MissingEndpoint)
        );
    }
}
