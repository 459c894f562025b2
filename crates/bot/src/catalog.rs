//! Model and focus catalogs with menu rendering and reply resolution.
//!
//! Both catalogs are fixed tables. Menus render the entries in table order
//! with the current choice marked, followed by a numbered legend; replies
//! are resolved strictly as 1-based indexes into the same order.

/// One selectable entry in a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Stable identifier sent to the backend.
    pub id: &'static str,
    /// Display name, emoji prefix included.
    pub name: &'static str,
    pub description: &'static str,
}

impl CatalogEntry {
    /// Display name with the emoji prefix stripped, for the numbered legend.
    #[must_use]
    pub fn plain_name(&self) -> &str {
        self.name
            .trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
            .trim_end()
    }
}

/// Answering models, in menu order.
pub const MODELS: &[CatalogEntry] = &[
    CatalogEntry { id: "sonar", name: "⚡ Sonar", description: "Rápido (10x), 128K" },
    CatalogEntry { id: "sonar-pro", name: "🔥 Sonar Pro", description: "2x retrieval, 200K" },
    CatalogEntry { id: "gpt-5.2", name: "🧠 GPT-5.2", description: "OpenAI, coding" },
    CatalogEntry { id: "reasoning-pro", name: "🤔 Reasoning Pro", description: "Lógica stepwise" },
    CatalogEntry { id: "deep-research", name: "📊 Deep Research", description: "Pesquisa máxima" },
];

/// Search focuses, in menu order.
pub const FOCUSES: &[CatalogEntry] = &[
    CatalogEntry { id: "web", name: "🌐 Web", description: "Busca geral" },
    CatalogEntry { id: "academic", name: "🎓 Academic", description: "Papers científicos" },
    CatalogEntry { id: "writing", name: "✍️ Writing", description: "Conteúdo criativo" },
    CatalogEntry { id: "video", name: "🎥 Video", description: "YouTube/Vídeos" },
    CatalogEntry { id: "social", name: "💬 Social", description: "X/Reddit" },
    CatalogEntry { id: "math", name: "🔢 Math", description: "Matemática" },
    CatalogEntry { id: "wolfram", name: "🧮 Wolfram", description: "Cálculos avançados" },
];

/// Render the model picker with `current` marked.
#[must_use]
pub fn render_models(current: &str) -> String {
    let mut menu = String::from("🤖 *Escolher Modelo AI*\n\n");
    for entry in MODELS {
        let marker = if entry.id == current { "✅" } else { "○" };
        menu.push_str(&format!("{marker} *{}*\n   _{}_\n\n", entry.name, entry.description));
    }
    menu.push_str("\n*Responda com o número do modelo:*\n");
    for (i, entry) in MODELS.iter().enumerate() {
        menu.push_str(&format!("{}. {}\n", i + 1, entry.plain_name()));
    }
    menu
}

/// Render the focus picker with `current` marked.
#[must_use]
pub fn render_focuses(current: &str) -> String {
    let mut menu = String::from("🔍 *Modo de Busca (Focus)*\n\n");
    for entry in FOCUSES {
        let marker = if entry.id == current { "✅" } else { "○" };
        menu.push_str(&format!("{marker} *{}* - {}\n", entry.name, entry.description));
    }
    menu.push_str("\n*Responda com o número do focus:*\n");
    for (i, entry) in FOCUSES.iter().enumerate() {
        menu.push_str(&format!("{}. {}\n", i + 1, entry.plain_name()));
    }
    menu
}

/// Resolve a menu reply against `entries` as a strict 1-based index.
///
/// Anything that is not a whole number in `[1, entries.len()]` is `None`;
/// trailing garbage after the digits does not count as a number.
#[must_use]
pub fn resolve<'a>(entries: &'a [CatalogEntry], reply: &str) -> Option<&'a CatalogEntry> {
    let index: usize = reply.trim().parse().ok()?;
    index.checked_sub(1).and_then(|i| entries.get(i))
}
