pub mod decoder;
pub mod markup;
pub mod stream;
pub mod syntax;
pub mod view;

pub use decoder::Utf8StreamDecoder;
pub use markup::{Block, CodeBlock, MarkdownRenderer, MarkupRenderer, Rendered, escape_html};
pub use stream::{StreamConsumer, StreamOutcome, StreamReport, StreamState, StreamStateMachine};
pub use syntax::{DEFAULT_THEME, HighlightOutput, Highlighter, SyntectHighlighter};
pub use view::View;
