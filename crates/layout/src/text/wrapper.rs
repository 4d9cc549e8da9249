use crate::flow::{ParagraphUnit, SpanContent, TextSpan};
use crate::reference::ReferenceTable;
use crate::style::ComputedStyle;
use folio_style::text::TextAlign;
use folio_traits::TextMeasurer;
use folio_types::AnchorId;
use std::borrow::Cow;
use std::sync::Arc;

const EPSILON: f32 = 0.01;

/// A position inside a paragraph's span list: span index plus byte offset
/// into that span's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TextPos {
    pub span: usize,
    pub byte: usize,
}

/// A run of text on one line sharing one style and link target.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub text: String,
    /// Offset from the left edge of the content box, alignment applied.
    pub x: f32,
    pub width: f32,
    pub style: Arc<ComputedStyle>,
    pub href: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub items: Vec<LineItem>,
    /// Natural width without trailing whitespace.
    pub width: f32,
    pub height: f32,
    /// Distance from the top of the line to the baseline.
    pub baseline: f32,
    /// Extra advance per space (PDF `Tw`) for justified lines.
    pub word_spacing: f32,
    /// Where the next line starts.
    pub end: TextPos,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphLayout {
    pub lines: Vec<LineLayout>,
    /// Rendered page numbers are part of the layout.
    pub volatile: bool,
}

impl ParagraphLayout {
    pub fn height(&self) -> f32 {
        self.lines.iter().map(|l| l.height).sum()
    }

    pub fn height_of(&self, count: usize) -> f32 {
        self.lines.iter().take(count).map(|l| l.height).sum()
    }

    /// How many leading lines fit into `available` points.
    pub fn lines_fitting(&self, available: f32) -> usize {
        let mut used = 0.0;
        let mut count = 0;
        for line in &self.lines {
            if used + line.height > available + EPSILON {
                break;
            }
            used += line.height;
            count += 1;
        }
        count
    }
}

struct Atom<'s> {
    text: Cow<'s, str>,
    span: usize,
    end: TextPos,
    style: &'s Arc<ComputedStyle>,
    href: Option<&'s Arc<str>>,
    width: f32,
    trimmed_width: f32,
    break_after: bool,
    hard_break: bool,
    splittable: bool,
    start_byte: usize,
}

struct LineBuilder<'s> {
    atoms: Vec<Atom<'s>>,
    full: f32,
    trimmed: f32,
    indent: f32,
    end: TextPos,
}

impl<'s> LineBuilder<'s> {
    fn new(indent: f32, start: TextPos) -> Self {
        Self { atoms: Vec::new(), full: 0.0, trimmed: 0.0, indent, end: start }
    }

    fn is_empty(&self) -> bool {
        self.atoms.iter().all(|a| a.text.is_empty())
    }

    fn fits(&self, width: f32, max_width: f32) -> bool {
        self.indent + self.full + width <= max_width + EPSILON
    }

    fn push(&mut self, atom: Atom<'s>) {
        self.trimmed = self.full + atom.trimmed_width;
        self.full += atom.width;
        self.end = atom.end;
        self.atoms.push(atom);
    }
}

/// Breaks styled spans into lines using a measurer. Greedy: each line takes
/// as many words as fit.
pub struct TextWrapper<'a> {
    measurer: &'a dyn TextMeasurer,
    references: &'a ReferenceTable,
    placeholder: &'a str,
}

impl<'a> TextWrapper<'a> {
    pub fn new(measurer: &'a dyn TextMeasurer, references: &'a ReferenceTable, placeholder: &'a str) -> Self {
        Self { measurer, references, placeholder }
    }

    /// The page `target` lands on as displayed text, or the placeholder.
    pub fn page_text(&self, target: &AnchorId) -> Cow<'a, str> {
        match self.references.page_of(target) {
            Some(page) => Cow::Owned(page.to_string()),
            None => Cow::Borrowed(self.placeholder),
        }
    }

    pub fn references(&self) -> &'a ReferenceTable {
        self.references
    }

    pub fn placeholder(&self) -> &'a str {
        self.placeholder
    }

    pub fn measure(&self, text: &str, style: &ComputedStyle) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        self.measurer.measure(text, &style.font_spec(), style.text.font_size)
    }

    /// Lays out a paragraph part into lines of at most `max_width` points.
    pub fn break_lines(&self, unit: &ParagraphUnit, block_style: &ComputedStyle, max_width: f32) -> ParagraphLayout {
        let atoms = self.atoms(&unit.spans, unit.preserve_whitespace);
        let align = if unit.preserve_whitespace { TextAlign::Left } else { block_style.text.text_align };
        let first_indent = if unit.offset == 0 { block_style.misc.first_line_indent } else { 0.0 };

        let mut lines = Vec::new();
        let mut line = LineBuilder::new(first_indent, TextPos::default());
        let mut word: Vec<Atom> = Vec::new();
        for atom in atoms {
            let ends_word = atom.break_after || atom.hard_break;
            let hard = atom.hard_break;
            word.push(atom);
            if ends_word {
                self.place_word(std::mem::take(&mut word), &mut line, &mut lines, block_style, max_width, align);
                if hard {
                    let end = line.end;
                    let finished = std::mem::replace(&mut line, LineBuilder::new(0.0, end));
                    lines.push(finalize_line(finished, block_style, max_width, align, true));
                }
            }
        }
        if !word.is_empty() {
            self.place_word(word, &mut line, &mut lines, block_style, max_width, align);
        }
        if !line.atoms.is_empty() || lines.is_empty() {
            lines.push(finalize_line(line, block_style, max_width, align, true));
        }

        ParagraphLayout { lines, volatile: unit.has_page_numbers() }
    }

    fn place_word<'s>(
        &self,
        word: Vec<Atom<'s>>,
        line: &mut LineBuilder<'s>,
        lines: &mut Vec<LineLayout>,
        style: &ComputedStyle,
        max_width: f32,
        align: TextAlign,
    ) {
        let full: f32 = word.iter().map(|a| a.width).sum();
        let last_trim = word.last().map_or(0.0, |a| a.width - a.trimmed_width);
        let trimmed = full - last_trim;

        if line.fits(trimmed, max_width) {
            word.into_iter().for_each(|a| line.push(a));
            return;
        }
        if !line.is_empty() {
            next_line(line, lines, style, max_width, align);
            if line.fits(trimmed, max_width) {
                word.into_iter().for_each(|a| line.push(a));
                return;
            }
        }

        // Longer than a whole line: place atom by atom, breaking inside atoms as needed.
        for atom in word {
            if line.fits(atom.trimmed_width, max_width) {
                line.push(atom);
                continue;
            }
            if !line.is_empty() {
                next_line(line, lines, style, max_width, align);
                if line.fits(atom.trimmed_width, max_width) {
                    line.push(atom);
                    continue;
                }
            }
            if !atom.splittable {
                line.push(atom);
                continue;
            }
            let mut chunks = self.split_atom(atom, max_width - line.indent).into_iter().peekable();
            while let Some(chunk) = chunks.next() {
                line.push(chunk);
                if chunks.peek().is_some() {
                    next_line(line, lines, style, max_width, align);
                }
            }
        }
    }

    /// Breaks an overlong atom into pieces of at most `max_width`, each at
    /// least one character.
    fn split_atom<'s>(&self, atom: Atom<'s>, max_width: f32) -> Vec<Atom<'s>> {
        let text = atom.text.as_ref();
        let mut pieces = Vec::new();
        let mut start = 0;
        let mut width = 0.0;
        for (i, c) in text.char_indices() {
            let mut buf = [0u8; 4];
            let cw = self.measure(c.encode_utf8(&mut buf), atom.style);
            if i > start && width + cw > max_width + EPSILON {
                pieces.push((start, i));
                start = i;
                width = 0.0;
            }
            width += cw;
        }
        pieces.push((start, text.len()));

        let count = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(n, (from, to))| {
                let last = n + 1 == count;
                let piece = text[from..to].to_string();
                let width = self.measure(&piece, atom.style);
                let trimmed_width = self.measure(piece.trim_end(), atom.style);
                Atom {
                    text: Cow::Owned(piece),
                    span: atom.span,
                    end: if last {
                        atom.end
                    } else {
                        TextPos { span: atom.span, byte: atom.start_byte + to }
                    },
                    style: atom.style,
                    href: atom.href,
                    width,
                    trimmed_width,
                    break_after: last && atom.break_after,
                    hard_break: last && atom.hard_break,
                    splittable: true,
                    start_byte: atom.start_byte + from,
                }
            })
            .collect()
    }

    fn atoms<'s>(&self, spans: &'s [TextSpan], preserve: bool) -> Vec<Atom<'s>> {
        let mut atoms = Vec::new();
        for (index, span) in spans.iter().enumerate() {
            match &span.content {
                SpanContent::Text(text) => {
                    for piece in segment(text) {
                        let display = &text[piece.start..piece.display_end];
                        atoms.push(Atom {
                            text: Cow::Borrowed(display),
                            span: index,
                            end: TextPos { span: index, byte: piece.end },
                            style: &span.style,
                            href: span.href.as_ref(),
                            width: self.measure(display, &span.style),
                            trimmed_width: self.measure(display.trim_end(), &span.style),
                            break_after: piece.break_after && !preserve,
                            hard_break: piece.hard_break,
                            splittable: true,
                            start_byte: piece.start,
                        });
                    }
                }
                SpanContent::PageNumber(target) => {
                    let text: Cow<'s, str> = Cow::Owned(self.page_text(target).into_owned());
                    let width = self.measure(&text, &span.style);
                    atoms.push(Atom {
                        text,
                        span: index,
                        end: TextPos { span: index + 1, byte: 0 },
                        style: &span.style,
                        href: span.href.as_ref(),
                        width,
                        trimmed_width: width,
                        break_after: false,
                        hard_break: false,
                        splittable: false,
                        start_byte: 0,
                    });
                }
                SpanContent::LineBreak => atoms.push(Atom {
                    text: Cow::Borrowed(""),
                    span: index,
                    end: TextPos { span: index + 1, byte: 0 },
                    style: &span.style,
                    href: None,
                    width: 0.0,
                    trimmed_width: 0.0,
                    break_after: false,
                    hard_break: true,
                    splittable: false,
                    start_byte: 0,
                }),
            }
        }
        atoms
    }
}

struct Piece {
    start: usize,
    display_end: usize,
    end: usize,
    break_after: bool,
    hard_break: bool,
}

/// Splits text into pieces that each end after a whitespace run or at a
/// newline. The newline belongs to its piece but is not displayed.
fn segment(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut seen_space = false;
    for (i, c) in text.char_indices() {
        if c == '\n' {
            pieces.push(Piece { start, display_end: i, end: i + 1, break_after: false, hard_break: true });
            start = i + 1;
            seen_space = false;
        } else if c.is_whitespace() {
            seen_space = true;
        } else if seen_space {
            pieces.push(Piece { start, display_end: i, end: i, break_after: true, hard_break: false });
            start = i;
            seen_space = false;
        }
    }
    if start < text.len() {
        pieces.push(Piece { start, display_end: text.len(), end: text.len(), break_after: seen_space, hard_break: false });
    }
    pieces
}

fn next_line<'s>(
    line: &mut LineBuilder<'s>,
    lines: &mut Vec<LineLayout>,
    style: &ComputedStyle,
    max_width: f32,
    align: TextAlign,
) {
    let end = line.end;
    let finished = std::mem::replace(line, LineBuilder::new(0.0, end));
    lines.push(finalize_line(finished, style, max_width, align, false));
}

/// Merges atoms into items and applies alignment against `max_width`.
fn finalize_line(line: LineBuilder<'_>, block_style: &ComputedStyle, max_width: f32, align: TextAlign, last: bool) -> LineLayout {
    let mut items: Vec<LineItem> = Vec::new();
    let mut height = block_style.text.line_height;
    let mut font_size = block_style.text.font_size;
    let mut x = line.indent;
    let count = line.atoms.len();
    let mut spaces = 0usize;

    for (n, atom) in line.atoms.iter().enumerate() {
        height = height.max(atom.style.text.line_height);
        font_size = font_size.max(atom.style.text.font_size);
        if atom.text.is_empty() {
            continue;
        }
        let is_last = n + 1 == count;
        let (text, width) = if is_last {
            (atom.text.trim_end(), atom.trimmed_width)
        } else {
            (atom.text.as_ref(), atom.width)
        };
        spaces += text.matches(' ').count();
        match items.last_mut() {
            Some(prev)
                if Arc::ptr_eq(&prev.style, atom.style)
                    && prev.href.as_ref().map(|h| h.as_ref()) == atom.href.map(|h| h.as_ref()) =>
            {
                prev.text.push_str(text);
                prev.width += width;
            }
            _ => items.push(LineItem {
                text: text.to_string(),
                x,
                width,
                style: atom.style.clone(),
                href: atom.href.cloned(),
            }),
        }
        x += width;
    }
    // A whitespace-only last atom trims to nothing.
    items.retain(|i| !i.text.is_empty());

    let width = line.trimmed;
    let free_space = (max_width - line.indent - width).max(0.0);
    let mut word_spacing = 0.0;
    match align {
        TextAlign::Center => items.iter_mut().for_each(|i| i.x += free_space / 2.0),
        TextAlign::Right => items.iter_mut().for_each(|i| i.x += free_space),
        TextAlign::Justify if !last && spaces > 0 && free_space > 0.0 => {
            word_spacing = free_space / spaces as f32;
            let mut shift = 0.0;
            for item in &mut items {
                item.x += shift;
                let inner = item.text.matches(' ').count() as f32 * word_spacing;
                item.width += inner;
                shift += inner;
            }
        }
        _ => {}
    }

    LineLayout {
        items,
        width,
        height,
        baseline: (height - font_size) / 2.0 + font_size * 0.8,
        word_spacing,
        end: line.end,
    }
}

/// Splits spans at `pos`: everything before goes left, the rest right.
/// Concatenating both sides yields the input exactly.
pub fn split_spans(spans: &[TextSpan], pos: TextPos) -> (Vec<TextSpan>, Vec<TextSpan>) {
    let split_at = pos.span.min(spans.len());
    let mut first: Vec<TextSpan> = spans[..split_at].to_vec();
    let mut rest: Vec<TextSpan> = Vec::new();
    if let Some(span) = spans.get(split_at) {
        match &span.content {
            SpanContent::Text(text) if pos.byte >= text.len() => first.push(span.clone()),
            SpanContent::Text(text) if pos.byte > 0 => {
                let (head, tail) = text.split_at(pos.byte);
                first.push(TextSpan { content: SpanContent::Text(head.to_string()), ..span.clone() });
                rest.push(TextSpan { content: SpanContent::Text(tail.to_string()), ..span.clone() });
            }
            _ => rest.push(span.clone()),
        }
        rest.extend_from_slice(&spans[split_at + 1..]);
    }
    (first, rest)
}

/// Length used to key remainders: text bytes plus one per atomic span.
pub fn spans_len(spans: &[TextSpan]) -> usize {
    spans
        .iter()
        .map(|s| match &s.content {
            SpanContent::Text(t) => t.len(),
            _ => 1,
        })
        .sum()
}
