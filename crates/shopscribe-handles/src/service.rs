use std::sync::Arc;

use shopscribe_ai::{GenerationRequest, Generator, Prompt};
use shopscribe_core::{HandleBatchRequest, HandleEntry, HandleValidator, TrustGenerator};
use tracing::info;

use crate::HandleError;
use crate::parse::parse_handles;
use crate::prompt::{HANDLE_RULES_PROMPT, build_handle_prompt};

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Generates handles for a batch of product names with a single model call.
///
/// The generator is optional so the service can start without a credential;
/// requests then fail with [`HandleError::MissingCredential`] before any call.
pub struct HandleService {
    generator: Option<Arc<dyn Generator>>,
    validator: Arc<dyn HandleValidator>,
    max_tokens: u32,
}

impl HandleService {
    pub fn new(generator: Option<Arc<dyn Generator>>) -> Self {
        Self {
            generator,
            validator: Arc::new(TrustGenerator),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Replace the post-generation hook (defaults to [`TrustGenerator`]).
    pub fn with_validator(mut self, validator: Arc<dyn HandleValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn generate(
        &self,
        request: &HandleBatchRequest,
    ) -> Result<Vec<HandleEntry>, HandleError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or(HandleError::MissingCredential)?;
        if request.product_names.is_empty() {
            return Err(HandleError::EmptyInput);
        }

        let prompt = build_handle_prompt(&request.product_names, &request.existing_handles);
        info!(
            products = request.product_names.len(),
            existing = request.existing_handles.len(),
            "generating handles"
        );
        let response = generator
            .generate(&GenerationRequest {
                system: HANDLE_RULES_PROMPT,
                prompt: Prompt::text(prompt),
                max_tokens: self.max_tokens,
            })
            .await?;

        let entries = parse_handles(&response)?;
        let entries = self
            .validator
            .validate(entries, &request.existing_handles);
        info!(handles = entries.len(), "handles generated");
        Ok(entries)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use shopscribe_ai::GenerateError;
    use shopscribe_core::DisambiguateDuplicates;
    use std::sync::Mutex;

    /// Replies with a canned response (or error) and records every prompt.
    pub(crate) struct ScriptedGenerator {
        reply: Mutex<Option<Result<String, GenerateError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn ok(text: &str) -> Arc<Self> {
            Self::new(Ok(text.to_string()))
        }

        pub fn err(err: GenerateError) -> Arc<Self> {
            Self::new(Err(err))
        }

        fn new(reply: Result<String, GenerateError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerateError> {
            assert_eq!(request.system, HANDLE_RULES_PROMPT);
            self.prompts.lock().unwrap().push(request.prompt.text.clone());
            self.reply
                .lock()
                .unwrap()
                .take()
                .expect("generator called more than once")
        }
    }

    fn request(names: &[&str], existing: &[&str]) -> HandleBatchRequest {
        HandleBatchRequest {
            product_names: names.iter().map(|s| s.to_string()).collect(),
            existing_handles: existing.iter().map(|s| s.to_string()).collect(),
        }
    }

    const MIKE_AND_IKE: &str = r#"[
        {"product_name": "Mike & Ike Mega Mix 5lb", "handle": "mike-ike-mega-mix"},
        {"product_name": "Mike & Ike Mega Mix 10lb", "handle": "mike-ike-mega-mix-10lb"}
    ]"#;

    #[tokio::test]
    async fn one_entry_per_product_in_order() {
        let generator = ScriptedGenerator::ok(MIKE_AND_IKE);
        let service = HandleService::new(Some(generator.clone()));
        let names = ["Mike & Ike Mega Mix 5lb", "Mike & Ike Mega Mix 10lb"];

        let entries = service.generate(&request(&names, &[])).await.unwrap();
        assert_eq!(entries.len(), 2);
        for (entry, name) in entries.iter().zip(names) {
            assert_eq!(entry.product_name, name);
        }
        let handles: Vec<&str> = entries.iter().map(|e| e.handle.as_str()).collect();
        assert_eq!(handles, vec!["mike-ike-mega-mix", "mike-ike-mega-mix-10lb"]);

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("1. Mike & Ike Mega Mix 5lb\n2. Mike & Ike Mega Mix 10lb\n"));
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_call() {
        let service = HandleService::new(None);
        let err = service.generate(&request(&[], &[])).await.unwrap_err();
        assert!(matches!(err, HandleError::MissingCredential));
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_a_call() {
        let generator = ScriptedGenerator::ok("[]");
        let service = HandleService::new(Some(generator.clone()));
        let err = service.generate(&request(&[], &[])).await.unwrap_err();
        assert!(matches!(err, HandleError::EmptyInput));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fenced_invalid_json_returns_raw_and_no_results() {
        let raw = "```json\n[{\"product_name\": \"A\", \"handle\": \n```";
        let service = HandleService::new(Some(ScriptedGenerator::ok(raw)));
        match service.generate(&request(&["A"], &[])).await {
            Err(HandleError::ResponseFormat { raw: got }) => assert_eq!(got, raw),
            other => panic!("expected ResponseFormat, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn auth_failure_is_distinguished() {
        let generator = ScriptedGenerator::err(GenerateError::Auth("invalid x-api-key".into()));
        let service = HandleService::new(Some(generator));
        let err = service.generate(&request(&["A"], &[])).await.unwrap_err();
        assert!(matches!(err, HandleError::Auth));
    }

    #[tokio::test]
    async fn trusts_duplicates_by_default() {
        let reply = r#"[{"product_name":"A","handle":"nerds"},{"product_name":"B","handle":"nerds"}]"#;
        let service = HandleService::new(Some(ScriptedGenerator::ok(reply)));
        let entries = service.generate(&request(&["A", "B"], &[])).await.unwrap();
        assert_eq!(entries[1].handle, "nerds");
    }

    #[tokio::test]
    async fn validator_hook_runs_with_existing_handles() {
        let reply = r#"[{"product_name":"A","handle":"nerds"},{"product_name":"B","handle":"nerds"}]"#;
        let service = HandleService::new(Some(ScriptedGenerator::ok(reply)))
            .with_validator(Arc::new(DisambiguateDuplicates));
        let entries = service
            .generate(&request(&["A", "B"], &["nerds"]))
            .await
            .unwrap();
        let handles: Vec<&str> = entries.iter().map(|e| e.handle.as_str()).collect();
        assert_eq!(handles, vec!["nerds-2", "nerds-3"]);
    }
}
