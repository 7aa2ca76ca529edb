//! Markup rendering of message content.
//!
//! Content is split into markup blocks (rendered to HTML) and fenced code
//! blocks (kept as source so a later pass can highlight them).

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};

/// A fenced code region of rendered output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub source: String,
    /// Highlighted form, filled in by the highlighting pass
    pub highlighted: Option<String>,
}

impl CodeBlock {
    pub fn new(language: Option<String>, source: impl Into<String>) -> Self {
        Self { language, source: source.into(), highlighted: None }
    }

    pub fn to_html(&self) -> String {
        if let Some(highlighted) = &self.highlighted {
            return highlighted.clone();
        }
        match &self.language {
            Some(lang) => {
                format!("<pre><code class=\"language-{}\">{}</code></pre>\n", escape_html(lang), escape_html(&self.source))
            }
            None => format!("<pre><code>{}</code></pre>\n", escape_html(&self.source)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Rendered HTML for a run of non-code content
    Markup(String),
    Code(CodeBlock),
}

/// Rendered form of one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub blocks: Vec<Block>,
}

impl Rendered {
    pub fn code(source: impl Into<String>, language: &str) -> Self {
        Self { blocks: vec![Block::Code(CodeBlock::new(Some(language.to_string()), source))] }
    }

    pub fn to_html(&self) -> String {
        self.blocks
            .iter()
            .map(|block| match block {
                Block::Markup(markup) => markup.clone(),
                Block::Code(code) => code.to_html(),
            })
            .collect()
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeBlock> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Code(code) => Some(code),
            Block::Markup(_) => None,
        })
    }

    pub fn code_blocks_mut(&mut self) -> impl Iterator<Item = &mut CodeBlock> {
        self.blocks.iter_mut().filter_map(|block| match block {
            Block::Code(code) => Some(code),
            Block::Markup(_) => None,
        })
    }

    pub fn is_highlighted(&self) -> bool {
        self.code_blocks().any(|code| code.highlighted.is_some())
    }
}

/// Turns message content into [`Rendered`] output
pub trait MarkupRenderer: Send + Sync {
    /// Render the whole content; called again on every frame with the full buffer
    fn render(&self, source: &str) -> Rendered;

    /// Render content as a single code block of a fixed language
    fn render_code(&self, source: &str, language: &str) -> Rendered {
        Rendered::code(source, language)
    }
}

/// CommonMark renderer backed by pulldown-cmark
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupRenderer for MarkdownRenderer {
    fn render(&self, source: &str) -> Rendered {
        let mut blocks = Vec::new();
        let mut markup_events: Vec<Event> = Vec::new();
        let mut code: Option<CodeBlock> = None;

        for event in Parser::new_ext(source, self.options) {
            if let Some(block) = code.as_mut() {
                match event {
                    Event::Text(text) => block.source.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some(block) = code.take() {
                            blocks.push(Block::Code(block));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    flush_markup(&mut markup_events, &mut blocks);
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                        CodeBlockKind::Indented => None,
                    };
                    code = Some(CodeBlock::new(language, String::new()));
                }
                event => markup_events.push(event),
            }
        }

        // An unterminated fence still yields its End event, but guard against
        // a parser that stops early.
        if let Some(block) = code.take() {
            blocks.push(Block::Code(block));
        }
        flush_markup(&mut markup_events, &mut blocks);

        Rendered { blocks }
    }
}

fn flush_markup(events: &mut Vec<Event>, blocks: &mut Vec<Block>) {
    if events.is_empty() {
        return;
    }
    let mut out = String::new();
    html::push_html(&mut out, events.drain(..));
    if !out.is_empty() {
        blocks.push(Block::Markup(out));
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
