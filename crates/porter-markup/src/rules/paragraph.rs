use std::borrow::Cow;

use regex::Regex;

use crate::error::{MarkupError, Result};
use crate::rule::{RewriteRule, RuleContext};

/// Final whitespace pass over canonical markup.
///
/// Line endings are unified, trailing blanks on each line are dropped, runs of
/// blank lines collapse to a single empty line between blocks, and the text
/// is trimmed at both ends. Code blocks are copied through verbatim apart
/// from line endings.
#[derive(Debug)]
pub struct ParagraphNormalizer {
    code_block: Regex,
    trailing_blanks: Regex,
    blank_runs: Regex,
}

impl ParagraphNormalizer {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|source| MarkupError::InvalidPattern {
                rule: "paragraphs".to_string(),
                source,
            })
        };
        Ok(Self {
            code_block: compile(r"(?s)\[code(?:=[^\]]*)?\].*?\[/code\]")?,
            trailing_blanks: compile(r"[ \t]+\n")?,
            blank_runs: compile(r"\n{3,}")?,
        })
    }

    fn tidy(&self, segment: &str, out: &mut String) {
        let stripped = self.trailing_blanks.replace_all(segment, "\n");
        out.push_str(&self.blank_runs.replace_all(&stripped, "\n\n"));
    }
}

impl RewriteRule for ParagraphNormalizer {
    fn name(&self) -> &str {
        "paragraphs"
    }

    fn apply<'t>(&self, text: &'t str, _context: &RuleContext<'_>) -> Cow<'t, str> {
        let unified = text.replace("\r\n", "\n").replace('\r', "\n");

        let mut out = String::with_capacity(unified.len());
        let mut last = 0;
        for block in self.code_block.find_iter(&unified) {
            self.tidy(&unified[last..block.start()], &mut out);
            out.push_str(block.as_str());
            last = block.end();
        }
        self.tidy(&unified[last..], &mut out);

        let trimmed = out.trim_start_matches('\n').trim_end();
        if trimmed == text {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(trimmed.to_string())
        }
    }
}
