//! Line breaking of styled spans.

pub mod wrapper;

pub use wrapper::{LineItem, LineLayout, ParagraphLayout, TextPos, TextWrapper, split_spans, spans_len};
