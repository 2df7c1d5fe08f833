use serde::{Deserialize, Serialize};
use tracing::info;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct Client {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

/// One role-tagged unit of conversation text.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Error envelope the API returns with a non-2xx status.
#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl Client {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    pub async fn chat(&self, model: &str, turns: &[Turn]) -> Result<String, Error> {
        let messages: Vec<ApiMessage> = turns
            .iter()
            .map(|t| ApiMessage {
                role: match t.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: t.content.clone(),
            })
            .collect();

        let request = ApiRequest {
            model: model.to_string(),
            messages,
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            // The API wraps failures in {"error": {"message": ...}}. Anything
            // else (proxy pages, truncated bodies) is passed through raw.
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(Error::Api { status: status.as_u16(), message });
        }

        info!("Completion response: {body}");

        let api_response: ApiResponse =
            serde_json::from_str(&body).map_err(|e| Error::Parse(e.to_string()))?;

        api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or(Error::Empty)
    }
}

#[derive(Debug)]
pub enum Error {
    /// Transport failure before a response was obtained.
    Http(String),
    /// The service answered with its own error envelope.
    Api { status: u16, message: String },
    /// The response body could not be decoded.
    Parse(String),
    /// The response carried no choices.
    Empty,
}

impl Error {
    /// True for failures the service itself reported, the only kind worth
    /// retrying.
    pub fn is_service_error(&self) -> bool {
        matches!(self, Error::Api { .. })
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api { status, message } => write!(f, "API error {status}: {message}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns() -> Vec<Turn> {
        vec![
            Turn { role: Role::System, content: "You are terse.".to_string() },
            Turn { role: Role::User, content: "hi".to_string() },
        ]
    }

    #[tokio::test]
    async fn test_chat_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [
                        {"message": {"role": "assistant", "content": "hello there"}},
                        {"message": {"role": "assistant", "content": "ignored"}}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = Client::new("sk-test".to_string()).with_base_url(server.url());
        let reply = client.chat("gpt-3.5-turbo", &turns()).await.unwrap();
        assert_eq!(reply, "hello there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_sends_roles_and_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "You are terse."},
                    {"role": "user", "content": "hi"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": "ok"}}]}"#)
            .create_async()
            .await;

        let client = Client::new("sk-test".to_string()).with_base_url(server.url());
        client.chat("gpt-3.5-turbo", &turns()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_envelope_is_extracted() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#)
            .create_async()
            .await;

        let client = Client::new("sk-test".to_string()).with_base_url(server.url());
        let err = client.chat("gpt-3.5-turbo", &turns()).await.unwrap_err();
        assert!(err.is_service_error());
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_kept_raw() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = Client::new("sk-test".to_string()).with_base_url(server.url());
        let err = client.chat("gpt-3.5-turbo", &turns()).await.unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_not_a_service_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let client = Client::new("sk-test".to_string()).with_base_url(server.url());
        let err = client.chat("gpt-3.5-turbo", &turns()).await.unwrap_err();
        assert!(matches!(err, Error::Empty));
        assert!(!err.is_service_error());
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_a_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = Client::new("sk-test".to_string()).with_base_url(server.url());
        let err = client.chat("gpt-3.5-turbo", &turns()).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(!err.is_service_error());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_http_error() {
        // Nothing listens on this port.
        let client =
            Client::new("sk-test".to_string()).with_base_url("http://127.0.0.1:9".to_string());
        let err = client.chat("gpt-3.5-turbo", &turns()).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert!(!err.is_service_error());
    }
}
