use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::models::chat::{ChatMessage, ChatReply, ConversationId};
use crate::services::company_data::{CompanyData, CompanyDataService};
use crate::services::roi::{self, RoiError, RoiReport};

use super::error::{ChatError, ProviderError};
use super::store::ConversationStore;
use super::types::{Conversation, StoreStats};

/// Result of one model invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub reply_text: String,
    /// Full history to store; the provider decides how turns are appended or pruned
    pub updated_history: Vec<ChatMessage>,
}

/// Trait for the language-model collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    async fn invoke(
        &self,
        message: &str,
        history: &[ChatMessage],
        company: &CompanyData,
        language: &str,
    ) -> Result<ModelReply, ProviderError>;
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 7;

/// Coordinates conversation history, model invocation and conversation ids
pub struct ConversationOrchestrator {
    store: Arc<ConversationStore>,
    company: Arc<CompanyDataService>,
    model: Arc<dyn ModelProvider>,
    default_language: String,
}

impl ConversationOrchestrator {
    pub fn new(
        store: Arc<ConversationStore>,
        company: Arc<CompanyDataService>,
        model: Arc<dyn ModelProvider>,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            store,
            company,
            model,
            default_language: default_language.into(),
        }
    }

    /// Send one message. An absent or unknown id starts a new conversation.
    ///
    /// Calls for the same id are serialized: a second call waits until the
    /// first one has stored its history. On failure the store is untouched.
    pub async fn send_message(
        &self,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<ChatReply, ChatError> {
        let start_time = Instant::now();
        let supplied = conversation_id.filter(|id| !id.is_empty());

        let _guard = match supplied {
            Some(id) => Some(self.store.lock(id).await),
            None => None,
        };

        let mut conversation = supplied
            .and_then(|id| self.store.get(id))
            .unwrap_or_else(|| Conversation::new(Vec::new(), self.default_language.clone()));

        if conversation.history.is_empty() {
            debug!("Starting new conversation (supplied id: {:?})", supplied);
            conversation.language = self.default_language.clone();
        }

        let company = self.company.get();
        let reply = match self
            .model
            .invoke(message, &conversation.history, &company, &conversation.language)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                let err = ChatError::from(err);
                error!(
                    code = err.kind.code(),
                    error = %err.message,
                    user_message = %err.user_message,
                    "Error processing chat message"
                );
                return Err(err);
            }
        };

        let id = supplied
            .map(str::to_string)
            .unwrap_or_else(Self::generate_conversation_id);

        if reply.updated_history.is_empty() {
            warn!("Model returned an empty history for conversation {}", id);
        }

        conversation.history = reply.updated_history;
        let turns = conversation.turn_count();
        self.store.put(id.clone(), conversation);

        info!(
            "Chat message processed: conversation={}, turns={}, elapsed={}ms",
            id,
            turns,
            start_time.elapsed().as_millis()
        );

        Ok(ChatReply {
            reply_text: reply.reply_text,
            conversation_id: id,
        })
    }

    /// Stored history, empty for an unknown id
    pub fn get_history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        if conversation_id.is_empty() {
            return Vec::new();
        }
        self.store
            .get(conversation_id)
            .map(|c| c.history)
            .unwrap_or_default()
    }

    /// Returns whether an entry existed and was removed.
    ///
    /// Waits for an in-flight `send_message` on the same id, so its write-back
    /// cannot resurrect the cleared history.
    pub async fn clear_conversation(&self, conversation_id: &str) -> bool {
        if conversation_id.is_empty() {
            return false;
        }
        let _guard = self.store.lock(conversation_id).await;
        let cleared = self.store.remove(conversation_id).is_some();
        debug!("Clear conversation {}: {}", conversation_id, cleared);
        cleared
    }

    pub fn calculate_roi(&self, monthly_bill: f64, state: Option<&str>) -> Result<RoiReport, RoiError> {
        let company = self.company.get();
        roi::calculate(monthly_bill, state, &company.pricing).map_err(|e| {
            error!("Error calculating ROI: {}", e);
            e
        })
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// `conv_<unix millis>_<7 base36 chars>`
    pub fn generate_conversation_id() -> ConversationId {
        let mut rng = rand::rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
            .collect();
        format!("conv_{}_{}", Utc::now().timestamp_millis(), suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation::error::{ErrorKind, DEFAULT_USER_MESSAGE};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Appends user + assistant turns, recording what it was called with
    #[derive(Default)]
    struct EchoProvider {
        delay: Option<Duration>,
        calls: Mutex<Vec<(String, Vec<ChatMessage>, String)>>,
    }

    #[async_trait::async_trait]
    impl ModelProvider for EchoProvider {
        async fn invoke(
            &self,
            message: &str,
            history: &[ChatMessage],
            _company: &CompanyData,
            language: &str,
        ) -> Result<ModelReply, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((message.to_string(), history.to_vec(), language.to_string()));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let reply_text = format!("echo: {}", message);
            let mut updated_history = history.to_vec();
            updated_history.push(ChatMessage::user(message));
            updated_history.push(ChatMessage::assistant(reply_text.clone()));
            Ok(ModelReply { reply_text, updated_history })
        }
    }

    fn orchestrator(model: Arc<dyn ModelProvider>) -> (ConversationOrchestrator, Arc<ConversationStore>) {
        let store = Arc::new(ConversationStore::unbounded());
        let orchestrator = ConversationOrchestrator::new(
            store.clone(),
            Arc::new(CompanyDataService::default()),
            model,
            "english",
        );
        (orchestrator, store)
    }

    #[tokio::test]
    async fn test_new_conversation_gets_id_and_history() {
        let (orchestrator, _) = orchestrator(Arc::new(EchoProvider::default()));

        let reply = orchestrator.send_message("Hello", None).await.unwrap();

        assert!(!reply.conversation_id.is_empty());
        assert_eq!(reply.reply_text, "echo: Hello");
        assert_eq!(orchestrator.get_history(&reply.conversation_id).len(), 2);
    }

    #[tokio::test]
    async fn test_continuity_passes_previous_history() {
        let provider = Arc::new(EchoProvider::default());
        let (orchestrator, _) = orchestrator(provider.clone());

        let first = orchestrator.send_message("m1", None).await.unwrap();
        let after_first = orchestrator.get_history(&first.conversation_id);

        let second = orchestrator
            .send_message("m2", Some(&first.conversation_id))
            .await
            .unwrap();
        assert_eq!(second.conversation_id, first.conversation_id);

        let calls = provider.calls.lock().unwrap();
        assert!(calls[0].1.is_empty());
        assert_eq!(calls[1].1, after_first);
        assert_eq!(orchestrator.get_history(&first.conversation_id).len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_id_starts_new_conversation() {
        let provider = Arc::new(EchoProvider::default());
        let (orchestrator, _) = orchestrator(provider.clone());

        let reply = orchestrator
            .send_message("hi", Some("nonexistent-id"))
            .await
            .unwrap();

        assert_eq!(reply.conversation_id, "nonexistent-id");
        assert!(provider.calls.lock().unwrap()[0].1.is_empty());
        assert_eq!(orchestrator.get_history("nonexistent-id").len(), 2);
    }

    #[tokio::test]
    async fn test_empty_id_is_treated_as_absent() {
        let (orchestrator, store) = orchestrator(Arc::new(EchoProvider::default()));

        let reply = orchestrator.send_message("hi", Some("")).await.unwrap();

        assert!(reply.conversation_id.starts_with("conv_"));
        assert!(store.get("").is_none());
        assert!(orchestrator.get_history("").is_empty());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (orchestrator, _) = orchestrator(Arc::new(EchoProvider::default()));
        let reply = orchestrator.send_message("hi", None).await.unwrap();
        let id = reply.conversation_id;

        assert!(orchestrator.clear_conversation(&id).await);
        assert!(orchestrator.get_history(&id).is_empty());
        assert!(!orchestrator.clear_conversation(&id).await);
        assert!(!orchestrator.clear_conversation("never-created").await);
        assert!(!orchestrator.clear_conversation("").await);
    }

    #[tokio::test]
    async fn test_unclassified_failure_is_enriched() {
        let mut mock = MockModelProvider::new();
        mock.expect_invoke()
            .times(1)
            .returning(|_, _, _, _| Err(ProviderError::unclassified("socket closed")));
        let (orchestrator, _) = orchestrator(Arc::new(mock));

        let err = orchestrator.send_message("hi", None).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::ChatProcessing);
        assert_eq!(err.kind.code(), "CHAT_PROCESSING_ERROR");
        assert_eq!(err.user_message, DEFAULT_USER_MESSAGE);
        assert_eq!(err.message, "socket closed");
    }

    #[tokio::test]
    async fn test_classified_failure_is_kept() {
        let mut mock = MockModelProvider::new();
        mock.expect_invoke().returning(|_, _, _, _| {
            Err(ProviderError::new(ErrorKind::TokenExpired, "401").with_user_message("auth problem"))
        });
        let (orchestrator, _) = orchestrator(Arc::new(mock));

        let err = orchestrator.send_message("hi", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenExpired);
        assert_eq!(err.user_message, "auth problem");
    }

    #[tokio::test]
    async fn test_failure_leaves_store_untouched() {
        let mut mock = MockModelProvider::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_invoke()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|message, history, _, _| {
                let mut updated_history = history.to_vec();
                updated_history.push(ChatMessage::user(message.to_string()));
                updated_history.push(ChatMessage::assistant("first"));
                Ok(ModelReply { reply_text: "first".to_string(), updated_history })
            });
        mock.expect_invoke()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Err(ProviderError::new(ErrorKind::ApiError, "502")));
        let (orchestrator, store) = orchestrator(Arc::new(mock));

        let reply = orchestrator.send_message("one", Some("conv_x")).await.unwrap();
        let before = orchestrator.get_history(&reply.conversation_id);

        assert!(orchestrator.send_message("two", Some("conv_x")).await.is_err());
        assert_eq!(orchestrator.get_history("conv_x"), before);

        // A failed first message stores nothing
        let mut failing = MockModelProvider::new();
        failing
            .expect_invoke()
            .returning(|_, _, _, _| Err(ProviderError::unclassified("down")));
        let failing = ConversationOrchestrator::new(
            store.clone(),
            Arc::new(CompanyDataService::default()),
            Arc::new(failing),
            "english",
        );
        assert!(failing.send_message("hi", Some("conv_y")).await.is_err());
        assert!(store.get("conv_y").is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_first_message_scenario() {
        let mut mock = MockModelProvider::new();
        mock.expect_invoke()
            .times(1)
            .returning(|message, history, company, language| {
                assert_eq!(message.to_string(), "How much can I save?");
                assert!(history.is_empty());
                assert_eq!(company.name, CompanyData::builtin().name);
                assert_eq!(language.to_string(), "english");
                Ok(ModelReply {
                    reply_text: "About 3000 a month.".to_string(),
                    updated_history: vec![
                        ChatMessage::user("How much can I save?"),
                        ChatMessage::assistant("About 3000 a month."),
                    ],
                })
            });
        let (orchestrator, _) = orchestrator(Arc::new(mock));

        let reply = orchestrator
            .send_message("How much can I save?", None)
            .await
            .unwrap();

        assert_eq!(reply.reply_text, "About 3000 a month.");
        let history = orchestrator.get_history(&reply.conversation_id);
        assert_eq!(
            history,
            vec![
                ChatMessage::user("How much can I save?"),
                ChatMessage::assistant("About 3000 a month."),
            ]
        );
    }

    #[tokio::test]
    async fn test_language_hint() {
        let provider = Arc::new(EchoProvider::default());
        let (orchestrator, store) = orchestrator(provider.clone());

        let existing = Conversation::new(vec![ChatMessage::user("namaste")], "hindi");
        store.put("conv_hi".to_string(), existing);
        // Empty history counts as a new conversation
        store.put("conv_empty".to_string(), Conversation::new(Vec::new(), "tamil"));

        orchestrator.send_message("again", Some("conv_hi")).await.unwrap();
        orchestrator.send_message("hello", Some("conv_empty")).await.unwrap();

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0].2, "hindi");
        assert_eq!(calls[1].2, "english");
        assert_eq!(store.get("conv_empty").unwrap().language, "english");
    }

    #[tokio::test]
    async fn test_concurrent_messages_to_one_id_are_serialized() {
        let provider = Arc::new(EchoProvider {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        let (orchestrator, _) = orchestrator(provider.clone());

        let (a, b) = tokio::join!(
            orchestrator.send_message("a", Some("conv_shared")),
            orchestrator.send_message("b", Some("conv_shared")),
        );
        assert!(a.is_ok() && b.is_ok());

        // Neither update was lost
        let history = orchestrator.get_history("conv_shared");
        assert_eq!(history.len(), 4);
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[1].1.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_waits_for_in_flight_message() {
        let provider = Arc::new(EchoProvider {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let (orchestrator, _) = orchestrator(provider);
        orchestrator.send_message("first", Some("conv_c")).await.unwrap();

        let (sent, cleared) = tokio::join!(
            orchestrator.send_message("second", Some("conv_c")),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                orchestrator.clear_conversation("conv_c").await
            }
        );
        assert!(sent.is_ok());
        assert!(cleared);
        assert!(orchestrator.get_history("conv_c").is_empty());

        orchestrator.send_message("third", Some("conv_c")).await.unwrap();
        let contents: Vec<_> = orchestrator
            .get_history("conv_c")
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["third", "echo: third"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_ids_run_in_parallel() {
        let provider = Arc::new(EchoProvider {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let (orchestrator, store) = orchestrator(provider);

        let start = tokio::time::Instant::now();
        let results = futures::future::join_all(
            ["c1", "c2", "c3", "c4"]
                .iter()
                .map(|id| orchestrator.send_message("hi", Some(*id))),
        )
        .await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(store.len(), 4);
        // Four 100ms calls overlap instead of queueing
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_calculate_roi_uses_company_pricing() {
        let (orchestrator, _) = orchestrator(Arc::new(EchoProvider::default()));

        let report = orchestrator.calculate_roi(3000.0, Some("Maharashtra")).unwrap();
        assert_eq!(report.system_size_kw, 3.0);
        assert_eq!(report.currency, "INR");

        assert!(matches!(
            orchestrator.calculate_roi(-1.0, None),
            Err(RoiError::InvalidBill(_))
        ));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<_> = (0..1000)
            .map(|_| ConversationOrchestrator::generate_conversation_id())
            .collect();
        assert_eq!(ids.len(), 1000);

        let id = ids.into_iter().next().unwrap();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "conv");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| ID_ALPHABET.contains(&b)));
    }
}
