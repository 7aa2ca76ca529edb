use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

use crate::markup::{CodeBlock, Rendered};
use parley_core::{Error, Result};

/// Applies syntax highlighting to finished code blocks
pub trait Highlighter: Send + Sync {
    fn highlight(&self, code: &str, language: Option<&str>) -> String;

    /// One pass over every code block not yet highlighted; returns how many were touched
    fn highlight_pass(&self, rendered: &mut Rendered) -> usize {
        let mut touched = 0;
        for block in rendered.code_blocks_mut() {
            if block.highlighted.is_none() {
                block.highlighted = Some(self.highlight(&block.source, block.language.as_deref()));
                touched += 1;
            }
        }
        touched
    }
}

/// Target format of highlighted output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightOutput {
    /// Inline-styled `<pre>` HTML
    #[default]
    Html,
    /// 24-bit ANSI escapes for terminals
    Ansi,
}

/// Syntax highlighter for code blocks
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
    output: HighlightOutput,
}

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

impl SyntectHighlighter {
    /// Create a new syntax highlighter with default settings
    pub fn new(output: HighlightOutput) -> Self {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_set.themes.remove(DEFAULT_THEME).unwrap_or_default();
        Self { syntax_set: SyntaxSet::load_defaults_newlines(), theme, output }
    }

    /// Create a highlighter using a named bundled theme
    pub fn with_theme(theme: &str, output: HighlightOutput) -> Result<Self> {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_set.themes.remove(theme).ok_or_else(|| Error::Config(format!("unknown theme: {}", theme)))?;
        Ok(Self { syntax_set: SyntaxSet::load_defaults_newlines(), theme, output })
    }

    /// Names of the bundled themes
    pub fn theme_names() -> Vec<String> {
        ThemeSet::load_defaults().themes.into_keys().collect()
    }

    pub fn output(&self) -> HighlightOutput {
        self.output
    }

    fn find_syntax(&self, language: Option<&str>) -> &SyntaxReference {
        language
            .and_then(|lang| {
                self.syntax_set
                    .find_syntax_by_token(lang)
                    .or_else(|| self.syntax_set.find_syntax_by_name(lang))
                    .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            })
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }

    fn highlight_ansi(&self, code: &str, syntax: &SyntaxReference) -> String {
        let mut highlighter = HighlightLines::new(syntax, &self.theme);
        let mut out = String::new();

        for line in LinesWithEndings::from(code) {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => out.push_str(&as_24_bit_terminal_escaped(&ranges[..], false)),
                Err(e) => {
                    tracing::debug!(error = %e, "highlighting failed, emitting plain line");
                    out.push_str(line);
                }
            }
        }

        out.push_str("\x1b[0m");
        out
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new(HighlightOutput::default())
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, language: Option<&str>) -> String {
        let syntax = self.find_syntax(language);
        match self.output {
            HighlightOutput::Html => {
                syntect::html::highlighted_html_for_string(code, &self.syntax_set, syntax, &self.theme)
                    .unwrap_or_else(|e| {
                        tracing::debug!(error = %e, "highlighting failed, emitting plain block");
                        CodeBlock::new(language.map(str::to_string), code).to_html()
                    })
            }
            HighlightOutput::Ansi => self.highlight_ansi(code, syntax),
        }
    }
}
