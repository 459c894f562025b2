//! The `!` command vocabulary and the static reply texts.

use perplexo_backend::UserPrefs;

/// A recognized chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `!menu` / `!start`
    Menu,
    /// `!modelo` / `!modelos`
    ModelMenu,
    /// `!busca`
    FocusMenu,
    /// `!normal`
    NormalMode,
    /// `!config`
    ConfigView,
    /// `!ajuda` / `!help`
    Help,
    /// `!reasoning`
    ToggleReasoning,
    /// `!citations`
    ToggleCitations,
    /// `!imagens`
    ToggleImages,
}

impl Command {
    /// Parse a raw inbound text, case-insensitively on the trimmed form.
    ///
    /// Commands are checked before any pending menu state, so `!config` in
    /// the middle of a selection runs as a command.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_lowercase().trim() {
            "!menu" | "!start" => Some(Self::Menu),
            "!modelo" | "!modelos" => Some(Self::ModelMenu),
            "!busca" => Some(Self::FocusMenu),
            "!normal" => Some(Self::NormalMode),
            "!config" => Some(Self::ConfigView),
            "!ajuda" | "!help" => Some(Self::Help),
            "!reasoning" => Some(Self::ToggleReasoning),
            "!citations" => Some(Self::ToggleCitations),
            "!imagens" => Some(Self::ToggleImages),
            _ => None,
        }
    }
}

fn flag(on: bool) -> &'static str {
    if on { "🟢" } else { "🔴" }
}

/// Main menu shown by `!menu` and `!start`.
#[must_use]
pub fn main_menu(prefs: &UserPrefs) -> String {
    format!(
        "🌀 *Perplexo Bot* - Perplexity AI 2026\n\n\
         *Configuração Atual:*\n\
         🤖 Modelo: `{}`\n\
         🔍 Focus: `{}`\n\
         💬 Modo: `{}`\n\n\
         *Comandos disponíveis:*\n\
         • *!menu* - Mostrar este menu\n\
         • *!modelo* - Escolher modelo AI\n\
         • *!busca* - Modo de busca (Focus)\n\
         • *!normal* - Conversa casual\n\
         • *!config* - Configurações\n\
         • *!ajuda* - Guia de uso\n\n\
         _Envie sua pergunta diretamente!_",
        prefs.model, prefs.focus, prefs.mode
    )
}

/// Settings view shown by `!config`.
#[must_use]
pub fn config_view(prefs: &UserPrefs) -> String {
    format!(
        "⚙️ *Configurações*\n\n\
         *Modelo Atual:* `{}`\n\
         *Focus Atual:* `{}`\n\
         *Modo:* `{}`\n\n\
         *Opções:*\n\
         {} Reasoning\n\
         {} Citações\n\
         {} Imagens\n\n\
         *Comandos:*\n\
         • *!reasoning* - Alternar reasoning\n\
         • *!citations* - Alternar citações\n\
         • *!imagens* - Alternar imagens",
        prefs.model,
        prefs.focus,
        prefs.mode,
        flag(prefs.reasoning),
        flag(prefs.return_citations),
        flag(prefs.return_images),
    )
}

/// Usage guide shown by `!ajuda` and `!help`.
#[must_use]
pub fn help_text() -> &'static str {
    "❓ *Guia de Uso do Perplexo Bot*\n\n\
     *Comandos:*\n\
     • *!menu* - Menu principal\n\
     • *!modelo* - Escolher modelo AI\n\
     • *!busca* - Modo de busca (Focus)\n\
     • *!normal* - Conversa casual\n\
     • *!config* - Configurações\n\
     • *!ajuda* - Este guia\n\n\
     *Recursos:*\n\
     • Envie texto para perguntas\n\
     • Envie imagens para análise\n\
     • Envie arquivos .txt para resumir\n\
     • Envie áudio para transcrição\n\n\
     *Modelos:*\n\
     ⚡ Sonar - Rápido, Q&A\n\
     🔥 Sonar Pro - Análises detalhadas\n\
     🧠 GPT-5.2 - Coding\n\
     🤔 Reasoning Pro - Lógica\n\
     📊 Deep Research - Pesquisa"
}
