use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::database::{ChatDatabase, Conversation, MessageRole, MAX_FEEDBACK_SCORE, MIN_FEEDBACK_SCORE};
use crate::embedding::{EmbeddingProvider, HashingEmbedding, OpenAiEmbedding};
use crate::emotion::{
    Emotion, EmotionClassifier, EmotionReading, LexiconEmotionClassifier, LlmEmotionClassifier,
};
use crate::llm_client::{LanguageModel, LlmClient};
use crate::memory::{MemoryHit, MemoryMetadata, MemoryStore, Partition, SqliteMemoryBackend};
use crate::personality::store::PersonalityStore;
use crate::personality::{PersonalityEngine, PersonalitySettings, PersonalityTrait};

/// Result of one conversational turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub emotion: EmotionReading,
    /// The exact prompt sent to the language model
    pub prompt: String,
    pub user_message_id: i64,
    pub assistant_message_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Nothing has been said yet this session.
    NoResponse,
    Recorded { feedback_id: i64 },
}

/// Collaborators the orchestrator drives. Built from config by
/// [`Orchestrator::bootstrap`], or assembled directly in tests.
pub struct Components {
    pub database: ChatDatabase,
    pub memory: MemoryStore,
    pub personality: PersonalityEngine,
    pub classifier: Box<dyn EmotionClassifier>,
    pub model: Box<dyn LanguageModel>,
}

/// Runs one chat session: classify, recall, prompt, record, adapt.
pub struct Orchestrator {
    database: ChatDatabase,
    memory: MemoryStore,
    personality: PersonalityEngine,
    classifier: Box<dyn EmotionClassifier>,
    model: Box<dyn LanguageModel>,
    conversation: Conversation,
    last_response_id: Option<i64>,
    top_k: usize,
    include_long_term: bool,
}

impl Orchestrator {
    /// Open every store named in `config` and start a new conversation.
    pub fn bootstrap(config: &AgentConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = LlmClient::new(
            config.llm_api_url.clone(),
            api_key,
            config.llm_model.clone(),
        );

        let classifier: Box<dyn EmotionClassifier> = match &config.emotion_model {
            Some(model) => {
                tracing::info!("Emotion classifier: language model '{}'", model);
                Box::new(LlmEmotionClassifier::new(client.with_model(model.clone())))
            }
            None => {
                tracing::info!("Emotion classifier: keyword lexicon");
                Box::new(LexiconEmotionClassifier::new())
            }
        };

        let embedder: Arc<dyn EmbeddingProvider> = match &config.embedding_api_url {
            Some(url) => {
                tracing::info!("Embeddings: {} via {}", config.embedding_model, url);
                Arc::new(OpenAiEmbedding::new(
                    url.clone(),
                    config.embedding_api_key.clone().unwrap_or_default(),
                    config.embedding_model.clone(),
                    config.embedding_dimensions,
                ))
            }
            None => {
                tracing::info!(
                    "Embeddings: local hashing ({} dimensions)",
                    config.embedding_dimensions
                );
                Arc::new(HashingEmbedding::new(config.embedding_dimensions))
            }
        };

        let database = ChatDatabase::new(Path::new(&config.database_path))
            .with_context(|| format!("Failed to open {}", config.database_path))?;
        let memory_backend = SqliteMemoryBackend::new(Path::new(&config.memory_database_path))
            .with_context(|| format!("Failed to open {}", config.memory_database_path))?;
        let personality_store = PersonalityStore::new(Path::new(&config.personality_database_path))
            .with_context(|| format!("Failed to open {}", config.personality_database_path))?;
        let personality = PersonalityEngine::load(
            personality_store,
            PersonalitySettings {
                drift_magnitude: config.drift_magnitude,
                topic_decay_probability: config.topic_decay_probability,
            },
        )?;

        Self::new(
            Components {
                database,
                memory: MemoryStore::new(embedder, Box::new(memory_backend)),
                personality,
                classifier,
                model: Box::new(client),
            },
            config,
        )
    }

    pub fn new(components: Components, config: &AgentConfig) -> Result<Self> {
        let conversation = components
            .database
            .create_conversation(config.conversation_context.as_deref())?;
        tracing::info!("Started conversation {}", conversation.id);

        Ok(Self {
            database: components.database,
            memory: components.memory,
            personality: components.personality,
            classifier: components.classifier,
            model: components.model,
            conversation,
            last_response_id: None,
            top_k: config.memory_top_k,
            include_long_term: config.include_long_term,
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn personality(&self) -> &PersonalityEngine {
        &self.personality
    }

    pub fn database(&self) -> &ChatDatabase {
        &self.database
    }

    pub fn last_response_id(&self) -> Option<i64> {
        self.last_response_id
    }

    pub async fn chat(&mut self, input: &str) -> Result<TurnOutcome> {
        let reading = self.classifier.classify(input).await?;
        tracing::info!(
            "Detected emotion: {} (confidence {:.2})",
            reading.emotion,
            reading.confidence
        );

        let user_message_id = self
            .record(MessageRole::User, input, &reading)
            .await
            .context("Failed to record user message")?;

        let context = self.prepare_context(input).await?;
        let prompt = self.build_prompt(input, reading.emotion, &context);
        tracing::debug!("Prompt:\n{}", prompt);

        let reply = match self.model.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Language model call failed: {:#}", e);
                format!("An error occurred: {}", e)
            }
        };

        let assistant_message_id = self
            .record(MessageRole::Assistant, &reply, &reading)
            .await
            .context("Failed to record assistant message")?;
        self.last_response_id = Some(assistant_message_id);

        self.personality.update_from_interaction(
            input,
            &reply,
            reading.emotion,
            reading.confidence,
            None,
        )?;

        Ok(TurnOutcome {
            reply,
            emotion: reading,
            prompt,
            user_message_id,
            assistant_message_id,
        })
    }

    /// Attach a 1-5 score to the most recent reply and let it correct the profile.
    pub async fn provide_feedback(&mut self, score: u8, text: Option<&str>) -> Result<FeedbackOutcome> {
        if !(MIN_FEEDBACK_SCORE..=MAX_FEEDBACK_SCORE).contains(&score) {
            bail!(
                "Feedback score must be between {} and {}, got {}",
                MIN_FEEDBACK_SCORE,
                MAX_FEEDBACK_SCORE,
                score
            );
        }

        let Some(message_id) = self.last_response_id else {
            return Ok(FeedbackOutcome::NoResponse);
        };

        let feedback_id = self.database.save_feedback(message_id, score, text)?;
        let message = self
            .database
            .get_message(message_id)?
            .with_context(|| format!("Message {} disappeared from the log", message_id))?;

        self.personality.update_from_interaction(
            "",
            &message.content,
            message.emotion,
            message.emotion_confidence,
            Some(score),
        )?;
        tracing::info!("Recorded feedback {} (score {}) for message {}", feedback_id, score, message_id);

        Ok(FeedbackOutcome::Recorded { feedback_id })
    }

    /// Similar past messages plus the current personality instructions.
    pub async fn prepare_context(&self, input: &str) -> Result<String> {
        let hits = self
            .memory
            .query(input, self.top_k, self.include_long_term)
            .await?;
        tracing::debug!("Retrieved {} similar messages", hits.len());
        let instructions = self.personality.instructions()?;
        Ok(render_context(&hits, &instructions))
    }

    pub fn build_prompt(&self, input: &str, emotion: Emotion, context: &str) -> String {
        let profile = self.personality.profile();
        let mut prompt = format!("{}\n\nThe user is feeling {}. ", context, emotion);

        prompt.push_str(emotion_directive(emotion));

        if profile.get(PersonalityTrait::Empathy) > 7.0 {
            prompt.push_str("Show deep understanding of their perspective. ");
        }
        if profile.get(PersonalityTrait::Humor) > 7.0 {
            prompt.push_str("Use appropriate humor to lighten the mood. ");
        }

        let formality = profile.get(PersonalityTrait::Formality);
        if formality < 4.0 {
            prompt.push_str("Use casual, friendly language. ");
        } else if formality > 7.0 {
            prompt.push_str("Maintain a more professional tone. ");
        }

        let verbosity = profile.get(PersonalityTrait::Verbosity);
        if verbosity < 4.0 {
            prompt.push_str("Keep your response concise. ");
        } else if verbosity > 7.0 {
            prompt.push_str("Provide a detailed, thoughtful response. ");
        }

        prompt.push_str(&format!("\n\nUser: {}\nChatbot:", input));
        prompt
    }

    /// Log a message and index it in memory. The embedding is computed first
    /// so a failed embed leaves neither a log row nor a memory record.
    async fn record(&self, role: MessageRole, content: &str, reading: &EmotionReading) -> Result<i64> {
        let is_long_term = false;
        let embedding = self.memory.embed(content).await?;
        let id = self.database.save_message(
            self.conversation.id,
            role,
            content,
            reading.emotion,
            reading.confidence,
            is_long_term,
        )?;
        self.memory.store_embedding(
            id,
            embedding,
            content,
            MemoryMetadata {
                role,
                emotion: reading.emotion,
                emotion_confidence: reading.confidence,
                conversation_id: self.conversation.id,
            },
            Partition::for_message(is_long_term),
        )?;
        Ok(id)
    }
}

fn emotion_directive(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Joy => "Match their positive energy while being authentic. ",
        Emotion::Sadness => "Be supportive and empathetic. Acknowledge their feelings. ",
        Emotion::Anger => "Be calm and understanding without being dismissive. ",
        Emotion::Fear => "Be reassuring and provide a sense of safety. ",
        Emotion::Surprise => "Be engaging and responsive to their reaction. ",
        Emotion::Love | Emotion::Neutral => "",
    }
}

fn render_context(hits: &[MemoryHit], instructions: &str) -> String {
    let mut context = String::from("Conversation History and Context:\n");
    for hit in hits {
        context.push_str(&format!(
            "{} (Emotion: {}): {}\n",
            hit.metadata.role.as_db_str(),
            hit.metadata.emotion,
            hit.content
        ));
    }
    context.push_str("\n---\nPersonality Instructions:\n");
    context.push_str(instructions);
    context.push_str("\n---\n");
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: Option<String>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<String> {
            if let Ok(mut seen) = self.prompts.lock() {
                seen.push(prompt.to_string());
            }
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => bail!("service unavailable"),
            }
        }
    }

    struct UnreachableEmbedder;

    #[async_trait]
    impl EmbeddingProvider for UnreachableEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            bail!("embedding service timeout")
        }

        fn dimensions(&self) -> usize {
            64
        }
    }

    fn session(dir: &Path, reply: Option<&str>) -> (Orchestrator, Arc<Mutex<Vec<String>>>) {
        session_with(dir, reply, Arc::new(HashingEmbedding::new(64)))
    }

    fn session_with(
        dir: &Path,
        reply: Option<&str>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> (Orchestrator, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let config = AgentConfig {
            drift_magnitude: 0.0,
            topic_decay_probability: 0.0,
            ..AgentConfig::default()
        };
        let personality = PersonalityEngine::load(
            PersonalityStore::new(dir.join("personality.db")).unwrap(),
            PersonalitySettings {
                drift_magnitude: 0.0,
                topic_decay_probability: 0.0,
            },
        )
        .unwrap()
        .with_rng(Box::new(StdRng::seed_from_u64(11)));

        let orchestrator = Orchestrator::new(
            Components {
                database: ChatDatabase::new(dir.join("chat.db")).unwrap(),
                memory: MemoryStore::new(embedder, Box::new(InMemoryBackend::new())),
                personality,
                classifier: Box::new(LexiconEmotionClassifier::new()),
                model: Box::new(ScriptedModel {
                    reply: reply.map(str::to_string),
                    prompts: prompts.clone(),
                }),
            },
            &config,
        )
        .unwrap();
        (orchestrator, prompts)
    }

    #[tokio::test]
    async fn sad_turn_shapes_prompt_and_raises_empathy() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bot, prompts) = session(dir.path(), Some("I'm so sorry. That must be hard."));
        let before = bot.personality().profile().get(PersonalityTrait::Empathy);

        let outcome = bot.chat("I lost my job today").await.unwrap();

        assert_eq!(outcome.emotion.emotion, Emotion::Sadness);
        assert!(outcome.prompt.contains("Be supportive and empathetic"));
        assert!(outcome.prompt.starts_with("Conversation History and Context:\n"));
        assert!(outcome.prompt.contains("user (Emotion: sadness): I lost my job today"));
        assert!(outcome.prompt.ends_with("\n\nUser: I lost my job today\nChatbot:"));
        assert_eq!(prompts.lock().unwrap().as_slice(), &[outcome.prompt.clone()]);

        let after = bot.personality().profile().get(PersonalityTrait::Empathy);
        assert!(after >= before);

        let messages = bot
            .database()
            .get_conversation_messages(bot.conversation().id)
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].emotion, Emotion::Sadness);
        assert_eq!(bot.last_response_id(), Some(outcome.assistant_message_id));
    }

    #[tokio::test]
    async fn model_failure_becomes_the_reply() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bot, _) = session(dir.path(), None);

        let outcome = bot.chat("hello there").await.unwrap();
        assert_eq!(outcome.reply, "An error occurred: service unavailable");

        let stored = bot
            .database()
            .get_message(outcome.assistant_message_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.content, outcome.reply);
    }

    #[tokio::test]
    async fn failed_embedding_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bot, prompts) =
            session_with(dir.path(), Some("never sent"), Arc::new(UnreachableEmbedder));

        let err = bot.chat("hello").await.unwrap_err();
        assert!(format!("{:#}", err).contains("embedding service timeout"));

        let messages = bot
            .database()
            .get_conversation_messages(bot.conversation().id)
            .unwrap();
        assert!(messages.is_empty());
        assert!(prompts.lock().unwrap().is_empty());
        assert_eq!(bot.last_response_id(), None);
    }

    #[tokio::test]
    async fn feedback_requires_a_previous_reply() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bot, _) = session(dir.path(), Some("I understand how you feel."));

        assert_eq!(
            bot.provide_feedback(5, None).await.unwrap(),
            FeedbackOutcome::NoResponse
        );
        assert!(bot.provide_feedback(0, None).await.is_err());

        let outcome = bot.chat("I had a rough week").await.unwrap();
        let before = bot.personality().profile().get(PersonalityTrait::Empathy);
        let humor_before = bot.personality().profile().get(PersonalityTrait::Humor);

        let FeedbackOutcome::Recorded { feedback_id } =
            bot.provide_feedback(5, Some("spot on")).await.unwrap()
        else {
            panic!("expected recorded feedback");
        };

        let feedback = bot
            .database()
            .get_feedback_for_message(outcome.assistant_message_id)
            .unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].id, feedback_id);
        assert!(bot.personality().profile().get(PersonalityTrait::Empathy) > before);
        assert_eq!(
            bot.personality().profile().get(PersonalityTrait::Humor),
            humor_before
        );
    }

    #[test]
    fn prompt_carries_trait_directives() {
        let context = render_context(&[], "Use casual, conversational language.");
        assert_eq!(
            context,
            "Conversation History and Context:\n\n---\nPersonality Instructions:\nUse casual, conversational language.\n---\n"
        );
        assert_eq!(emotion_directive(Emotion::Neutral), "");
        assert_eq!(
            emotion_directive(Emotion::Fear),
            "Be reassuring and provide a sense of safety. "
        );
    }
}
