//! Per-user dispatch: command routing, menu selections, and the four
//! modality flows against the answering backend.

use {
    anyhow::Result,
    async_trait::async_trait,
    base64::{Engine as _, engine::general_purpose::STANDARD},
    std::{sync::Arc, time::Duration},
    tracing::{debug, info, warn},
};

use perplexo_backend::{
    ApiClient, Error as BackendError, SearchRequest, TranscribeRequest, UserPrefs, VisionRequest,
};

use crate::{
    catalog::{self, FOCUSES, MODELS},
    command::{self, Command},
    format::{self, MAX_CHUNK_CHARS, MAX_IMAGES},
    message::{ChatOutbound, InboundMessage, InboundPayload, InboundSink},
    prefs::PrefsStore,
    session::{MenuState, SessionMap},
};

/// Timeout for plain search queries.
const QUERY_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for image analysis.
const VISION_TIMEOUT: Duration = Duration::from_secs(90);
/// Timeout for document summarization.
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(90);
/// Timeout for audio transcription.
const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Documents are cut at this many characters before summarization.
const DOCUMENT_CHAR_LIMIT: usize = 10_000;
const TRUNCATION_MARKER: &str = "\n[...truncado]";

/// Language hint for the transcription endpoint.
const TRANSCRIBE_LANGUAGE: &str = "pt";
/// Vision prompt used when an image arrives without a caption.
const DEFAULT_VISION_PROMPT: &str = "O que você vê nesta imagem?";

/// One engine serves every user of a transport: all per-user state lives in
/// the keyed stores inside.
pub struct Engine {
    api: Arc<ApiClient>,
    prefs: PrefsStore,
    sessions: SessionMap,
    outbound: Arc<dyn ChatOutbound>,
}

impl Engine {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, outbound: Arc<dyn ChatOutbound>) -> Self {
        Self {
            prefs: PrefsStore::new(Arc::clone(&api)),
            sessions: SessionMap::new(),
            api,
            outbound,
        }
    }

    /// Handle one inbound message end to end.
    ///
    /// Backend failures are rendered to the user here and do not propagate;
    /// only transport send failures bubble up to the caller.
    pub async fn handle_message(&self, message: InboundMessage) -> Result<()> {
        if message.from_me {
            return Ok(());
        }
        let InboundMessage { chat_id, user_id, payload, .. } = message;
        let prefs = self.prefs.get(user_id).await;

        match payload {
            InboundPayload::Text { body } => {
                self.handle_text(&chat_id, user_id, &body, prefs).await
            },
            InboundPayload::Image { data, caption } => {
                self.handle_image(&chat_id, user_id, &data, caption.as_deref(), &prefs).await
            },
            InboundPayload::Document { data, file_name } => {
                self.handle_document(&chat_id, user_id, &data, &file_name, &prefs).await
            },
            InboundPayload::Audio { data } => {
                self.handle_audio(&chat_id, user_id, &data, &prefs).await
            },
            InboundPayload::Unsupported { kind } => {
                debug!(user_id, kind = %kind, "ignoring unsupported payload");
                Ok(())
            },
        }
    }

    /// Text routing order: commands, then a pending menu selection, then the
    /// free-form query path.
    async fn handle_text(
        &self,
        chat_id: &str,
        user_id: u64,
        text: &str,
        prefs: UserPrefs,
    ) -> Result<()> {
        if let Some(cmd) = Command::parse(text) {
            return self.run_command(chat_id, user_id, cmd, prefs).await;
        }

        if let Some(state) = self.sessions.take(user_id) {
            return self.apply_selection(chat_id, user_id, state, text, prefs).await;
        }

        self.run_query(chat_id, user_id, text, &prefs).await
    }

    async fn run_command(
        &self,
        chat_id: &str,
        user_id: u64,
        cmd: Command,
        mut prefs: UserPrefs,
    ) -> Result<()> {
        debug!(user_id, command = ?cmd, "command");
        match cmd {
            Command::Menu => self.send(chat_id, &command::main_menu(&prefs)).await,
            Command::ModelMenu => {
                self.send(chat_id, &catalog::render_models(&prefs.model)).await?;
                self.sessions.set(user_id, MenuState::SelectingModel);
                Ok(())
            },
            Command::FocusMenu => {
                self.send(chat_id, &catalog::render_focuses(&prefs.focus)).await?;
                self.sessions.set(user_id, MenuState::SelectingFocus);
                Ok(())
            },
            Command::NormalMode => {
                prefs.mode = "normal".to_string();
                prefs.return_citations = false;
                self.store_prefs(user_id, prefs).await;
                self.send(chat_id, "💬 *Modo Normal ativado*\n\nAgora respondo sem citações.")
                    .await
            },
            Command::ConfigView => self.send(chat_id, &command::config_view(&prefs)).await,
            Command::Help => self.send(chat_id, command::help_text()).await,
            Command::ToggleReasoning => {
                prefs.reasoning = !prefs.reasoning;
                let on = prefs.reasoning;
                self.store_prefs(user_id, prefs).await;
                let word = if on { "ativado" } else { "desativado" };
                self.send(chat_id, &format!("🧠 Reasoning {word}!")).await
            },
            Command::ToggleCitations => {
                prefs.return_citations = !prefs.return_citations;
                let on = prefs.return_citations;
                self.store_prefs(user_id, prefs).await;
                let word = if on { "ativadas" } else { "desativadas" };
                self.send(chat_id, &format!("📚 Citações {word}!")).await
            },
            Command::ToggleImages => {
                prefs.return_images = !prefs.return_images;
                let on = prefs.return_images;
                self.store_prefs(user_id, prefs).await;
                let word = if on { "ativadas" } else { "desativadas" };
                self.send(chat_id, &format!("🖼️ Imagens {word}!")).await
            },
        }
    }

    /// Resolve a menu reply. The pending state was already consumed, so the
    /// user lands back in idle whether or not the reply was valid.
    async fn apply_selection(
        &self,
        chat_id: &str,
        user_id: u64,
        state: MenuState,
        reply: &str,
        mut prefs: UserPrefs,
    ) -> Result<()> {
        let (entries, retry_hint) = match state {
            MenuState::SelectingModel => {
                (MODELS, "❌ Número inválido. Envie !modelo para ver opções.")
            },
            MenuState::SelectingFocus => {
                (FOCUSES, "❌ Número inválido. Envie !busca para ver opções.")
            },
        };

        let Some(entry) = catalog::resolve(entries, reply) else {
            return self.send(chat_id, retry_hint).await;
        };

        let confirmation = match state {
            MenuState::SelectingModel => {
                prefs.model = entry.id.to_string();
                format!("✅ Modelo alterado para *{}*", entry.name)
            },
            MenuState::SelectingFocus => {
                prefs.focus = entry.id.to_string();
                format!("✅ Focus alterado para *{}*", entry.name)
            },
        };
        prefs.mode = "busca".to_string();
        info!(user_id, choice = entry.id, "menu selection applied");
        self.store_prefs(user_id, prefs).await;
        self.send(chat_id, &confirmation).await
    }

    /// Free-form query: progress notice, search call, formatted reply in
    /// chunks, then related images when the user opted in.
    async fn run_query(
        &self,
        chat_id: &str,
        user_id: u64,
        query: &str,
        prefs: &UserPrefs,
    ) -> Result<()> {
        self.send(chat_id, "🤔 Processando...").await?;

        let request = SearchRequest {
            query: query.to_string(),
            model: prefs.model.clone(),
            focus: prefs.focus.clone(),
            enable_reasoning: prefs.reasoning,
            return_citations: prefs.return_citations,
            return_images: prefs.return_images,
            user_id,
        };

        let response = match self.api.search(&request, QUERY_TIMEOUT).await {
            Ok(response) => response,
            Err(BackendError::RateLimited { limit }) => {
                info!(user_id, limit, "query rate limited");
                let text = format!(
                    "⏱️ *Rate Limit Excedido*\n\nVocê atingiu o limite de {limit} requisições por hora."
                );
                return self.send(chat_id, &text).await;
            },
            Err(error) => {
                warn!(user_id, %error, "query failed");
                return self.send(chat_id, "❌ Erro ao processar. Tente novamente mais tarde.").await;
            },
        };

        let answer = format::compose_answer(&response, prefs);
        for chunk in format::chunk_text(&answer, MAX_CHUNK_CHARS) {
            self.send(chat_id, &chunk).await?;
        }

        if prefs.return_images && !response.images.is_empty() {
            for url in response.images.iter().take(MAX_IMAGES) {
                // One bad link must not drop the remaining images.
                if let Err(error) =
                    self.outbound.send_image_url(chat_id, url, "🖼️ Imagem relacionada").await
                {
                    warn!(user_id, url = %url, %error, "related image send failed");
                }
            }
        }
        Ok(())
    }

    async fn handle_image(
        &self,
        chat_id: &str,
        user_id: u64,
        data: &[u8],
        caption: Option<&str>,
        prefs: &UserPrefs,
    ) -> Result<()> {
        self.send(chat_id, "🖼️ Analisando imagem...").await?;

        let request = VisionRequest {
            query: caption
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_VISION_PROMPT)
                .to_string(),
            image_base64: STANDARD.encode(data),
            model: prefs.model.clone(),
            user_id,
        };

        match self.api.vision(&request, VISION_TIMEOUT).await {
            Ok(response) => {
                // Vision answers in `text` first; always a single message.
                let answer = [response.text.as_deref(), response.answer.as_deref()]
                    .into_iter()
                    .flatten()
                    .find(|s| !s.is_empty())
                    .unwrap_or("Não foi possível analisar a imagem.");
                self.send(chat_id, answer).await
            },
            Err(error) => {
                warn!(user_id, %error, "vision failed");
                self.send(chat_id, "❌ Erro ao analisar imagem. Tente novamente.").await
            },
        }
    }

    async fn handle_document(
        &self,
        chat_id: &str,
        user_id: u64,
        data: &[u8],
        file_name: &str,
        prefs: &UserPrefs,
    ) -> Result<()> {
        if !file_name.ends_with(".txt") {
            return self.send(chat_id, "⚠️ Por enquanto só aceito arquivos .txt").await;
        }

        self.send(chat_id, "📄 Processando arquivo...").await?;

        let content = String::from_utf8_lossy(data);
        let request = SearchRequest {
            query: format!("Resuma o seguinte texto:\n\n{}", truncate_document(&content)),
            model: prefs.model.clone(),
            focus: "writing".to_string(),
            enable_reasoning: false,
            return_citations: false,
            return_images: false,
            user_id,
        };

        match self.api.search(&request, SUMMARY_TIMEOUT).await {
            Ok(response) => {
                let summary = response.answer_text().unwrap_or_default();
                let answer = format!("📄 *Resumo de {file_name}:*\n\n{summary}");
                for chunk in format::chunk_text(&answer, MAX_CHUNK_CHARS) {
                    self.send(chat_id, &chunk).await?;
                }
                Ok(())
            },
            Err(error) => {
                warn!(user_id, %error, "document summary failed");
                self.send(chat_id, "❌ Erro ao processar arquivo.").await
            },
        }
    }

    /// Audio is transcribed, echoed back, then fed through the query flow
    /// under the user's current settings.
    async fn handle_audio(
        &self,
        chat_id: &str,
        user_id: u64,
        data: &[u8],
        prefs: &UserPrefs,
    ) -> Result<()> {
        self.send(chat_id, "🎤 Transcrevendo áudio...").await?;

        let request = TranscribeRequest {
            audio_base64: STANDARD.encode(data),
            language: TRANSCRIBE_LANGUAGE.to_string(),
            user_id,
        };

        let transcript = match self.api.transcribe(&request, TRANSCRIBE_TIMEOUT).await {
            Ok(response) => response.text.unwrap_or_default(),
            Err(error) => {
                warn!(user_id, %error, "transcription failed");
                return self
                    .send(
                        chat_id,
                        "❌ Erro ao processar áudio. Verifique se a transcrição está configurada.",
                    )
                    .await;
            },
        };

        if transcript.is_empty() {
            return self.send(chat_id, "❌ Não consegui entender o áudio.").await;
        }

        self.send(chat_id, &format!("🎤 *Transcrição:*\n_{transcript}_\n\n_Processando..._"))
            .await?;
        self.run_query(chat_id, user_id, &transcript, prefs).await
    }

    /// Persist a preference change; the cache stays authoritative when the
    /// remote write fails.
    async fn store_prefs(&self, user_id: u64, prefs: UserPrefs) {
        if let Err(error) = self.prefs.set(user_id, prefs).await {
            warn!(user_id, %error, "config persist failed");
        }
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<()> {
        self.outbound.send_text(chat_id, text).await
    }
}

/// Cut document text at the summarization limit, marking the cut.
fn truncate_document(content: &str) -> String {
    match content.char_indices().nth(DOCUMENT_CHAR_LIMIT) {
        Some((at, _)) => format!("{}{TRUNCATION_MARKER}", &content[..at]),
        None => content.to_string(),
    }
}

#[async_trait]
impl InboundSink for Engine {
    async fn dispatch(&self, message: InboundMessage) -> Result<()> {
        self.handle_message(message).await
    }
}
