//! Content transcoding for porter.
//!
//! Legacy platforms store post bodies in their own lightweight markup: a
//! restricted Markdown, one of the BBCode variants, or raw HTML. This crate
//! rewrites all of them into the single canonical markup through an ordered
//! list of small, named rewrite rules.
//!
//! # Key Types
//!
//! - [`Transcoder`]: One pipeline per [`Dialect`], built once per run
//! - [`RulePipeline`]: Ordered list of [`RewriteRule`]s
//! - [`PatternRule`]: A regex plus a template or callback replacement
//! - [`AttachmentResolver`]: Looks up embedded uploads by content hash
//! - [`TranscodedContent`]: The immutable result for one text field
//!
//! Transcoding never fails: a rule whose pattern does not match leaves the
//! text as it was.

pub mod dialect;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod rule;
pub mod rules;
pub mod transcoder;

pub use dialect::Dialect;
pub use error::{MarkupError, Result};
pub use pipeline::{RewriteOutcome, RulePipeline};
pub use resolver::{AttachmentIndex, AttachmentResolver, NoAttachments};
pub use rule::{PatternRule, Replacement, RewriteRule, RuleCallback, RuleContext};
pub use transcoder::{TranscodedContent, Transcoder};
