use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::pipeline::{RewriteOutcome, RulePipeline};
use crate::resolver::AttachmentResolver;
use crate::rule::RuleContext;
use crate::rules::{
    attachment_rules, bbcode, fixup_rules, html, MarkdownConverter, ParagraphNormalizer,
};

/// Immutable result of transcoding one source text field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TranscodedContent(String);

impl TranscodedContent {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for TranscodedContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TranscodedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for TranscodedContent {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The content transcoder: one rule pipeline per source dialect.
///
/// Build it once per run and share it by reference. Every pipeline runs the
/// stages in the same order: base conversion, structural fixups, embedded
/// upload resolution, paragraph normalization. Canonical input has no base
/// stage.
#[derive(Debug)]
pub struct Transcoder {
    markdown: RulePipeline,
    bbcode: RulePipeline,
    html: RulePipeline,
    canonical: RulePipeline,
}

impl Transcoder {
    pub fn new() -> Result<Self> {
        let mut markdown = RulePipeline::new();
        markdown.add_rule(Box::new(MarkdownConverter::new()));

        let mut bbcode = RulePipeline::new();
        bbcode.extend(bbcode::base_rules()?);

        let mut html = RulePipeline::new();
        html.extend(html::base_rules()?);

        let mut canonical = RulePipeline::new();

        for pipeline in [&mut markdown, &mut bbcode, &mut html, &mut canonical] {
            pipeline.extend(fixup_rules()?);
            pipeline.extend(attachment_rules()?);
            pipeline.add_rule(Box::new(ParagraphNormalizer::new()?));
        }

        Ok(Self {
            markdown,
            bbcode,
            html,
            canonical,
        })
    }

    /// The pipeline used for `dialect`.
    pub fn pipeline(&self, dialect: Dialect) -> &RulePipeline {
        match dialect {
            Dialect::Markdown => &self.markdown,
            Dialect::BbCode => &self.bbcode,
            Dialect::Html => &self.html,
            Dialect::Canonical => &self.canonical,
        }
    }

    /// Transcode `raw` and report which rules fired.
    pub fn rewrite(
        &self,
        dialect: Dialect,
        raw: &str,
        resolver: &dyn AttachmentResolver,
    ) -> RewriteOutcome {
        let outcome = self
            .pipeline(dialect)
            .apply(raw, &RuleContext::new(resolver));
        trace!(dialect = %dialect, rules = ?outcome.applied, "transcoded text");
        outcome
    }

    /// Transcode `raw` from `dialect` into canonical markup.
    pub fn transcode(
        &self,
        dialect: Dialect,
        raw: &str,
        resolver: &dyn AttachmentResolver,
    ) -> TranscodedContent {
        TranscodedContent(self.rewrite(dialect, raw, resolver).text)
    }
}
