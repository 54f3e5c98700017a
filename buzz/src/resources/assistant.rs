use crate::ports::Backend;
use serde_json::Value;
use shared::{Error, Result};
use shared_http::api::{
    AnalyzeContentRequest, GenerateContentRequest, GeneratedContent, HashtagRequest,
    MentionRequest, MentionSuggestions, OptimizeContentRequest, OptimizedContent, Platform,
};
use std::sync::Arc;
use tracing::{debug, error};

pub const DEFAULT_HASHTAG_COUNT: u32 = 10;
pub const DEFAULT_MENTION_COUNT: u32 = 5;

/// Content generation and suggestions. Answers depend on the prompt, so
/// nothing here is cached.
pub struct ContentAssistant {
    backend: Arc<dyn Backend>,
}

impl ContentAssistant {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Draft a post for each requested platform.
    pub async fn generate(&self, request: GenerateContentRequest) -> Result<GeneratedContent> {
        if request.prompt.trim().is_empty() {
            return Err(Error::Validation(
                "Please enter a prompt for AI content generation".to_string(),
            ));
        }
        debug!("Generating content for {} platform(s)", request.platforms.len());
        self.backend
            .generate_content(&request)
            .await
            .and_then(|r| r.into_data())
            .map_err(|e| report(e, "Failed to generate content"))
    }

    /// Hashtags for `content`, each starting with a single `#`.
    pub async fn suggest_hashtags(
        &self,
        content: &str,
        platform: Option<Platform>,
    ) -> Result<Vec<String>> {
        require_content(content)?;
        let request = HashtagRequest {
            content: content.to_string(),
            platform,
            count: DEFAULT_HASHTAG_COUNT,
        };
        let suggestions = self
            .backend
            .suggest_hashtags(&request)
            .await
            .and_then(|r| r.into_optional())
            .map_err(|e| report(e, "Failed to suggest hashtags"))?
            .unwrap_or_default();

        Ok(suggestions
            .hashtags
            .iter()
            .map(|tag| tag.trim().trim_start_matches('#'))
            .filter(|tag| !tag.is_empty())
            .map(|tag| format!("#{}", tag))
            .collect())
    }

    pub async fn suggest_mentions(
        &self,
        content: &str,
        platform: Option<Platform>,
    ) -> Result<MentionSuggestions> {
        require_content(content)?;
        let request = MentionRequest {
            content: content.to_string(),
            platform,
            count: DEFAULT_MENTION_COUNT,
            mention_types: vec!["brands".to_string(), "influencers".to_string()],
            verified_only: false,
        };
        Ok(self
            .backend
            .suggest_mentions(&request)
            .await
            .and_then(|r| r.into_optional())
            .map_err(|e| report(e, "Failed to suggest mentions"))?
            .unwrap_or_default())
    }

    /// Rewrite `content` for one platform.
    pub async fn optimize(&self, content: &str, target: Platform) -> Result<OptimizedContent> {
        require_content(content)?;
        let request = OptimizeContentRequest {
            content: content.to_string(),
            target_platform: target,
        };
        self.backend
            .optimize_content(&request)
            .await
            .and_then(|r| r.into_data())
            .map_err(|e| report(e, "Failed to optimize content"))
    }

    /// Backend-defined analysis of `content`.
    pub async fn analyze(&self, content: &str, platform: Platform) -> Result<Value> {
        require_content(content)?;
        let request = AnalyzeContentRequest {
            content: content.to_string(),
            platform,
        };
        Ok(self
            .backend
            .analyze_content(&request)
            .await
            .and_then(|r| r.into_optional())
            .map_err(|e| report(e, "Failed to analyze content"))?
            .unwrap_or_default())
    }

    pub async fn health(&self) -> Result<Value> {
        Ok(self
            .backend
            .assistant_health()
            .await?
            .into_optional()?
            .unwrap_or_default())
    }
}

fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::Validation("Please enter some content first".to_string()));
    }
    Ok(())
}

fn report(e: Error, fallback: &str) -> Error {
    let e = e.or_context(fallback);
    error!("{}: {}", fallback, e);
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBackend;

    fn assistant() -> (Arc<FakeBackend>, ContentAssistant) {
        let backend = Arc::new(FakeBackend::seeded());
        (backend.clone(), ContentAssistant::new(backend))
    }

    #[tokio::test]
    async fn test_generate_requires_prompt() {
        let (backend, assistant) = assistant();
        let err = assistant
            .generate(GenerateContentRequest::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::Validation("Please enter a prompt for AI content generation".to_string())
        );
        assert_eq!(backend.calls("generate_content"), 0);
    }

    #[tokio::test]
    async fn test_generate_drafts_each_platform() {
        let (_, assistant) = assistant();
        let generated = assistant
            .generate(GenerateContentRequest {
                prompt: "spring launch".to_string(),
                platforms: vec![Platform::Instagram, Platform::Twitter],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(generated.content.len(), 2);
        assert_eq!(
            generated.content["twitter"].content.as_deref(),
            Some("spring launch")
        );
    }

    #[tokio::test]
    async fn test_hashtags_get_a_single_prefix() {
        let (_, assistant) = assistant();
        let tags = assistant.suggest_hashtags("coffee", None).await.unwrap();
        assert_eq!(tags, vec!["#coffee", "#morning"]);

        let err = assistant.suggest_hashtags(" ", None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_failures_keep_server_message() {
        let (backend, assistant) = assistant();
        backend.fail("optimize_content", Error::Http {
            status: 429,
            message: "AI quota exceeded".to_string(),
        });
        let err = assistant.optimize("hello", Platform::Linkedin).await.unwrap_err();
        assert_eq!(err.to_string(), "AI quota exceeded");

        let analysis = assistant.analyze("hello", Platform::Linkedin).await.unwrap();
        assert_eq!(analysis["platform"], "linkedin");
    }
}
