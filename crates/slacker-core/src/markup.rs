// ABOUTME: Tokenizer and renderer for Slack message markup.
// ABOUTME: One token stream feeds both identifier discovery and final text rendering.

use unicode_segmentation::UnicodeSegmentation;

use crate::emoji;
use crate::ident::{IdentifierKey, ResolvedName};

/// Default preview length in grapheme clusters.
pub const PREVIEW_LEN: usize = 80;

const ELLIPSIS: char = '…';

/// A lexical unit of Slack markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, already unescaped.
    Text(String),
    /// `<@U123>` or `<@U123|label>`
    User { id: String, label: Option<String> },
    /// `<#C123>` or `<#C123|label>`
    Channel { id: String, label: Option<String> },
    /// `<!subteam^S123|@group>`
    Subteam { id: String, label: Option<String> },
    /// `<!here>`, `<!channel>`, `<!date^…|fallback>` and friends, pre-rendered.
    Special(String),
    /// `<https://…>` or `<https://…|label>`
    Link { url: String, label: Option<String> },
    /// `:shortcode:` (skin tones folded in as `name::skin-tone-N`)
    Emoji(String),
    /// A paired formatting marker (`*`, `_`, `~`, backticks); renders as nothing.
    Format,
}

impl Token {
    /// The identifier this token needs resolved, if any.
    pub fn reference(&self) -> Option<IdentifierKey> {
        match self {
            Token::User { id, .. } => Some(IdentifierKey::user(id.clone())),
            Token::Channel { id, .. } => Some(IdentifierKey::channel(id.clone())),
            _ => None,
        }
    }
}

/// How rendered text is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Keep whitespace and line breaks as written.
    Full,
    /// Collapse whitespace to single spaces and cut to this many graphemes.
    Preview(usize),
}

impl Default for RenderMode {
    fn default() -> Self {
        RenderMode::Preview(PREVIEW_LEN)
    }
}

/// Split `text` into tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    Tokenizer::new(text).run()
}

/// Identifiers referenced inline by a token stream.
pub fn references(tokens: &[Token]) -> impl Iterator<Item = IdentifierKey> + '_ {
    tokens.iter().filter_map(Token::reference)
}

/// Render `text` using `resolve` for inline references.
pub fn render<F>(text: &str, resolve: F, mode: RenderMode) -> String
where
    F: Fn(&IdentifierKey) -> ResolvedName,
{
    render_tokens(&tokenize(text), resolve, mode)
}

/// Render a previously tokenized stream.
pub fn render_tokens<F>(tokens: &[Token], resolve: F, mode: RenderMode) -> String
where
    F: Fn(&IdentifierKey) -> ResolvedName,
{
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::User { id, label } => {
                let name = resolve(&IdentifierKey::user(id.clone()));
                out.push('@');
                out.push_str(pick_name(&name, label.as_deref(), '@'));
            }
            Token::Channel { id, label } => {
                let name = resolve(&IdentifierKey::channel(id.clone()));
                match name.display() {
                    // DM channels resolve to "@handle".
                    Some(display) if display.starts_with('@') => out.push_str(display),
                    _ => {
                        out.push('#');
                        out.push_str(pick_name(&name, label.as_deref(), '#'));
                    }
                }
            }
            Token::Subteam { label, .. } => match label {
                Some(label) => out.push_str(label),
                None => out.push_str("@team"),
            },
            Token::Special(text) => out.push_str(text),
            Token::Link { url, label } => match label {
                Some(label) => out.push_str(label),
                None => out.push_str(url.strip_prefix("mailto:").unwrap_or(url)),
            },
            Token::Emoji(code) => match emoji::glyph(code) {
                Some(glyph) => out.push_str(&glyph),
                // Unknown and custom emoji stay as written.
                None => {
                    out.push(':');
                    out.push_str(code);
                    out.push(':');
                }
            },
            Token::Format => {}
        }
    }

    match mode {
        RenderMode::Full => out,
        RenderMode::Preview(limit) => truncate_graphemes(&collapse_whitespace(&out), limit),
    }
}

/// Resolved display, then inline label, then raw id.
fn pick_name<'a>(name: &'a ResolvedName, label: Option<&'a str>, sigil: char) -> &'a str {
    if let Some(display) = name.display() {
        return display.strip_prefix(sigil).unwrap_or(display);
    }
    match label {
        Some(label) if !label.trim().is_empty() => label.strip_prefix(sigil).unwrap_or(label),
        _ => name.key().id(),
    }
}

/// Replace every whitespace run with one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to at most `limit` grapheme clusters.
///
/// When text is dropped the last kept cluster is replaced by `…`, so the
/// result never exceeds `limit` and never ends in a partial character.
pub fn truncate_graphemes(text: &str, limit: usize) -> String {
    let mut boundaries = text.grapheme_indices(true).map(|(idx, _)| idx);
    // Byte offset where the (limit + 1)th cluster starts, if there is one.
    let Some(overflow_at) = boundaries.nth(limit) else {
        return text.to_string();
    };
    if limit == 0 {
        return String::new();
    }
    let keep_end = text[..overflow_at]
        .grapheme_indices(true)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let mut out = text[..keep_end].trim_end().to_string();
    out.push(ELLIPSIS);
    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    literal: String,
    /// Byte offsets of closing formatting markers already paired with an opener.
    closers: Vec<usize>,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            tokens: Vec::new(),
            literal: String::new(),
            closers: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        let text = self.text;
        let bytes = text.as_bytes();
        while self.pos < bytes.len() {
            let consumed = match bytes[self.pos] {
                b'<' => self.angle(),
                b':' => self.emoji(),
                b'&' => self.entity(),
                b'`' => self.backtick(),
                b'*' | b'_' | b'~' => self.emphasis(),
                _ => None,
            };
            match consumed {
                Some(next) => self.pos = next,
                None => self.literal_run(),
            }
        }
        self.flush();
        self.tokens
    }

    /// Copy text up to the next byte that could start a token.
    fn literal_run(&mut self) {
        let start = self.pos;
        let first = self.text[start..].chars().next().map_or(1, char::len_utf8);
        let end = self.text[start + first..]
            .find(['<', ':', '&', '`', '*', '_', '~'])
            .map(|offset| start + first + offset)
            .unwrap_or(self.text.len());
        self.literal.push_str(&self.text[start..end]);
        self.pos = end;
    }

    fn push(&mut self, token: Token) {
        self.flush();
        self.tokens.push(token);
    }

    fn flush(&mut self) {
        if !self.literal.is_empty() {
            self.tokens
                .push(Token::Text(std::mem::take(&mut self.literal)));
        }
    }

    fn angle(&mut self) -> Option<usize> {
        let start = self.pos + 1;
        let close = start + self.text[start..].find('>')?;
        let inner = &self.text[start..close];
        if inner.is_empty() || inner.contains('<') {
            return None;
        }
        let (target, label) = match inner.split_once('|') {
            Some((target, label)) => (target, Some(unescape(label))),
            None => (inner, None),
        };

        let token = if let Some(id) = target.strip_prefix('@') {
            if id.is_empty() {
                return None;
            }
            Token::User {
                id: id.to_string(),
                label,
            }
        } else if let Some(id) = target.strip_prefix('#') {
            if id.is_empty() {
                return None;
            }
            Token::Channel {
                id: id.to_string(),
                label,
            }
        } else if let Some(special) = target.strip_prefix('!') {
            if let Some(id) = special.strip_prefix("subteam^") {
                Token::Subteam {
                    id: id.to_string(),
                    label,
                }
            } else {
                Token::Special(special_text(special, label))
            }
        } else {
            Token::Link {
                url: unescape(target),
                label,
            }
        };
        self.push(token);
        Some(close + 1)
    }

    fn emoji(&mut self) -> Option<usize> {
        let start = self.pos + 1;
        let len = self.text[start..]
            .bytes()
            .take_while(|b| is_shortcode_byte(*b))
            .count();
        let end = start + len;
        if len == 0 || self.text.as_bytes().get(end) != Some(&b':') {
            return None;
        }
        let code = &self.text[start..end];
        let has_letter = code.bytes().any(|b| b.is_ascii_lowercase());
        if !has_letter && emoji::glyph(code).is_none() {
            return None;
        }

        let mut code = code.to_string();
        let mut next = end + 1;
        if let Some(tone) = self.text[next..]
            .strip_prefix(":skin-tone-")
            .and_then(|rest| rest.get(..2))
            .filter(|t| t.as_bytes()[0].is_ascii_digit() && t.as_bytes()[1] == b':')
        {
            code.push_str("::skin-tone-");
            code.push_str(&tone[..1]);
            next += ":skin-tone-".len() + 2;
        }
        self.push(Token::Emoji(code));
        Some(next)
    }

    fn entity(&mut self) -> Option<usize> {
        let rest = &self.text[self.pos..];
        let (entity, replacement) = [("&lt;", '<'), ("&gt;", '>'), ("&amp;", '&')]
            .into_iter()
            .find(|(entity, _)| rest.starts_with(entity))?;
        self.literal.push(replacement);
        Some(self.pos + entity.len())
    }

    fn backtick(&mut self) -> Option<usize> {
        if self.text[self.pos..].starts_with("```") {
            self.push(Token::Format);
            return Some(self.pos + 3);
        }
        self.paired_marker(b'`', |_, _| true)
    }

    fn emphasis(&mut self) -> Option<usize> {
        let marker = self.text.as_bytes()[self.pos];
        self.paired_marker(marker, |before, after| {
            !before.is_some_and(|c| c.is_whitespace())
                && !after.is_some_and(|c| c.is_alphanumeric())
        })
    }

    /// Drop `marker` at the current position if it opens a span that closes
    /// later on the same line, or if it is a closer paired earlier.
    fn paired_marker<F>(&mut self, marker: u8, valid_closer: F) -> Option<usize>
    where
        F: Fn(Option<char>, Option<char>) -> bool,
    {
        if let Some(idx) = self.closers.iter().position(|&c| c == self.pos) {
            self.closers.swap_remove(idx);
            self.push(Token::Format);
            return Some(self.pos + 1);
        }

        let before = self.text[..self.pos].chars().next_back();
        let after = self.text[self.pos + 1..].chars().next();
        let opens = !before.is_some_and(|c| c.is_alphanumeric())
            && after.is_some_and(|c| !c.is_whitespace() && c != marker as char);
        if !opens {
            return None;
        }

        let line_end = self.text[self.pos + 1..]
            .find('\n')
            .map(|offset| self.pos + 1 + offset)
            .unwrap_or(self.text.len());
        let closer = (self.pos + 2..line_end).find(|&idx| {
            self.text.as_bytes()[idx] == marker
                && valid_closer(
                    self.text[..idx].chars().next_back(),
                    self.text[idx + 1..].chars().next(),
                )
        })?;
        self.closers.push(closer);
        self.push(Token::Format);
        Some(self.pos + 1)
    }
}

fn is_shortcode_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'+' | b'-' | b'\'')
}

fn special_text(name: &str, label: Option<String>) -> String {
    if let Some(label) = label {
        return label;
    }
    match name {
        "here" | "channel" | "everyone" => format!("@{name}"),
        // Dates and other parameterized commands without a fallback label.
        _ => String::new(),
    }
}
