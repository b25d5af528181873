use serde::{Deserialize, Serialize};

use crate::SamplingOptions;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    #[default]
    Assistant,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: SamplingOptions,
}

/// A complete chat reply, or one line of a streamed reply.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

/// Body of `GET /api/tags`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ChatMessage, ChatReply, ChatRequest, Role, TagsResponse};
    use crate::SamplingOptions;

    #[test]
    fn chat_request_matches_backend_body_shape() {
        let request = ChatRequest {
            model: "llama3.2:latest".to_owned(),
            messages: vec![ChatMessage::system("persona"), ChatMessage::user("hi")],
            stream: false,
            options: SamplingOptions::default(),
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "llama3.2:latest");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "persona"}));
        assert_eq!(body["messages"][1], json!({"role": "user", "content": "hi"}));
        assert_eq!(body["options"]["num_predict"], 500);
    }

    #[test]
    fn roles_use_lowercase_names() {
        let roles = serde_json::to_value([Role::System, Role::User, Role::Assistant]).unwrap();
        assert_eq!(roles, json!(["system", "user", "assistant"]));
        assert!(serde_json::from_value::<Role>(json!("tool")).is_err());
    }

    #[test]
    fn minimal_reply_decodes_with_defaults() {
        let reply: ChatReply =
            serde_json::from_value(json!({"message": {"content": "ok"}})).unwrap();
        assert_eq!(reply.message.content, "ok");
        assert_eq!(reply.message.role, Role::Assistant);
        assert!(!reply.done);
        assert_eq!(reply.model, None);
    }

    #[test]
    fn tags_response_tolerates_missing_models() {
        let tags: TagsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(tags.models.is_empty());

        let tags: TagsResponse = serde_json::from_value(json!({
            "models": [{"name": "llama3.2:latest", "size": 2019393189u64}]
        }))
        .unwrap();
        assert_eq!(tags.models[0].name, "llama3.2:latest");
        assert_eq!(tags.models[0].size, Some(2_019_393_189));
    }
}
