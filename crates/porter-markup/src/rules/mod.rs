//! Rule sets, one module per transcoding stage.

pub mod attachment;
pub mod bbcode;
pub mod fixups;
pub mod html;
pub mod markdown;
pub mod paragraph;

pub use attachment::attachment_rules;
pub use fixups::{canonical_language, fixup_rules, snap_font_size, ACCEPTED_FONT_SIZES};
pub use markdown::MarkdownConverter;
pub use paragraph::ParagraphNormalizer;
