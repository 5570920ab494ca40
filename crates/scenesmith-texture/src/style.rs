//! Prompt-to-style mapping.
//!
//! No language model involved: the prompt is matched against a short
//! keyword table, with a couple of adjective fallbacks, and everything
//! else lands on the checkerboard.

/// A procedural material style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    /// High-contrast checkerboard, mid roughness, no metalness.
    Checker,
    /// Value-noise albedo with blurred roughness and edge-detail normal.
    Stone,
    /// Flat gray albedo, low roughness, high metalness.
    Metal,
}

impl Style {
    /// Stable name, used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Checker => "checker",
            Style::Stone => "stone",
            Style::Metal => "metal",
        }
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const STYLE_KEYWORDS: &[(Style, &[&str])] = &[
    (Style::Checker, &["checker", "grid"]),
    (Style::Stone, &["stone", "rock", "cobble", "cobblestone"]),
    (Style::Metal, &["metal", "steel", "chrome"]),
];

/// Picks a style for a free-form prompt by keyword matching.
pub fn infer_style(prompt: &str) -> Style {
    let text = prompt.to_lowercase();
    for (style, keywords) in STYLE_KEYWORDS {
        if keywords.iter().any(|k| text.contains(k)) {
            return *style;
        }
    }
    // Adjective fallbacks for prompts that describe rather than name.
    if text.contains("wet") || text.contains("mossy") {
        return Style::Stone;
    }
    if text.contains("shiny") || text.contains("polished") {
        return Style::Metal;
    }
    Style::Checker
}
