//! Base conversion from the restricted Markdown dialect.
//!
//! The converter walks the event stream of a CommonMark parser and writes the
//! equivalent canonical constructs. Embedded BBCode (quotes, spoilers) and
//! raw HTML pass through as text for the later rules.

use std::borrow::Cow;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use crate::rule::{RewriteRule, RuleContext};

/// Markdown to canonical markup converter.
///
/// Holds the parser configuration; build it once and reuse it for every text.
#[derive(Clone, Debug)]
pub struct MarkdownConverter {
    options: Options,
}

impl MarkdownConverter {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }

    /// Convert one Markdown text.
    pub fn convert(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + text.len() / 4);
        let mut code: Option<String> = None;
        let mut image_depth = 0usize;

        for event in Parser::new_ext(text, self.options) {
            // Code block bodies are collected verbatim.
            if let Some(body) = code.as_mut() {
                match event {
                    Event::Text(t) => body.push_str(&t),
                    Event::End(Tag::CodeBlock(_)) => {
                        let body = code.take().unwrap_or_default();
                        out.push_str(body.trim_end_matches('\n'));
                        out.push_str("[/code]\n\n");
                    }
                    _ => {}
                }
                continue;
            }

            // Image alt text is dropped; the image tag is written on start.
            if image_depth > 0 {
                match event {
                    Event::Start(Tag::Image(..)) => image_depth += 1,
                    Event::End(Tag::Image(..)) => image_depth -= 1,
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    match kind {
                        CodeBlockKind::Fenced(info) => {
                            match info.split_whitespace().next() {
                                Some(lang) => {
                                    out.push_str("[code=");
                                    out.push_str(lang);
                                    out.push(']');
                                }
                                None => out.push_str("[code]"),
                            }
                        }
                        CodeBlockKind::Indented => out.push_str("[code]"),
                    }
                    code = Some(String::new());
                }
                Event::Start(Tag::Image(_, dest, _)) => {
                    out.push_str("[img]");
                    out.push_str(&dest);
                    out.push_str("[/img]");
                    image_depth = 1;
                }
                Event::Start(tag) => open_tag(&mut out, tag),
                Event::End(tag) => close_tag(&mut out, tag),
                Event::Text(t) => out.push_str(&t),
                Event::Code(c) => {
                    out.push_str("[icode]");
                    out.push_str(&c);
                    out.push_str("[/icode]");
                }
                Event::Html(html) => out.push_str(&html),
                Event::SoftBreak | Event::HardBreak => out.push('\n'),
                Event::Rule => {
                    ensure_line_start(&mut out);
                    out.push_str("[hr]\n\n");
                }
                Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
                Event::FootnoteReference(name) => {
                    out.push_str("[^");
                    out.push_str(&name);
                    out.push(']');
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }

        out
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteRule for MarkdownConverter {
    fn name(&self) -> &str {
        "markdown-base"
    }

    fn apply<'t>(&self, text: &'t str, _context: &RuleContext<'_>) -> Cow<'t, str> {
        Cow::Owned(self.convert(text))
    }
}

fn heading_size(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 24,
        HeadingLevel::H2 => 18,
        _ => 14,
    }
}

fn trim_trailing_newlines(out: &mut String) {
    while out.ends_with('\n') {
        out.pop();
    }
}

fn ensure_line_start(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn open_tag(out: &mut String, tag: Tag<'_>) {
    match tag {
        Tag::Heading(level, ..) => {
            out.push_str(&format!("[size={}][b]", heading_size(level)));
        }
        Tag::BlockQuote => {
            ensure_line_start(out);
            out.push_str("[quote]");
        }
        Tag::List(start) => {
            ensure_line_start(out);
            out.push_str(if start.is_some() { "[list=1]\n" } else { "[list]\n" });
        }
        Tag::Item => out.push_str("[*]"),
        Tag::FootnoteDefinition(name) => {
            out.push_str("[^");
            out.push_str(&name);
            out.push_str("]: ");
        }
        Tag::Table(_) => out.push_str("[table]"),
        Tag::TableHead | Tag::TableRow => out.push_str("[tr]"),
        Tag::TableCell => out.push_str("[td]"),
        Tag::Emphasis => out.push_str("[i]"),
        Tag::Strong => out.push_str("[b]"),
        Tag::Strikethrough => out.push_str("[s]"),
        Tag::Link(_, dest, _) => {
            out.push_str("[url='");
            out.push_str(&dest);
            out.push_str("']");
        }
        _ => {}
    }
}

fn close_tag(out: &mut String, tag: Tag<'_>) {
    match tag {
        Tag::Paragraph => out.push_str("\n\n"),
        Tag::Heading(..) => out.push_str("[/b][/size]\n\n"),
        Tag::BlockQuote => {
            trim_trailing_newlines(out);
            out.push_str("[/quote]\n\n");
        }
        Tag::List(_) => {
            trim_trailing_newlines(out);
            out.push_str("\n[/list]\n\n");
        }
        Tag::Item => {
            trim_trailing_newlines(out);
            out.push('\n');
        }
        Tag::FootnoteDefinition(_) => out.push_str("\n\n"),
        Tag::Table(_) => out.push_str("[/table]\n\n"),
        Tag::TableHead | Tag::TableRow => out.push_str("[/tr]"),
        Tag::TableCell => out.push_str("[/td]"),
        Tag::Emphasis => out.push_str("[/i]"),
        Tag::Strong => out.push_str("[/b]"),
        Tag::Strikethrough => out.push_str("[/s]"),
        Tag::Link(..) => out.push_str("[/url]"),
        _ => {}
    }
}
