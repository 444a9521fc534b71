//! Structural fixups shared by every dialect.
//!
//! These run after the base stage, when the text is already made of
//! canonical-looking tags, and bring tag attributes into the forms the
//! canonical markup accepts. Each rule is a no-op on canonical input.

use regex::Captures;

use crate::error::Result;
use crate::rule::{code_bodies, PatternRule, RuleContext};

/// Font sizes the canonical markup accepts, ascending.
pub const ACCEPTED_FONT_SIZES: [u32; 7] = [8, 10, 12, 14, 18, 24, 36];

/// Highlighter names the canonical `[code=…]` tag accepts.
pub const CODE_LANGUAGES: &[&str] = &[
    "bash",
    "c",
    "cpp",
    "csharp",
    "css",
    "diff",
    "go",
    "html",
    "java",
    "javascript",
    "json",
    "kotlin",
    "markdown",
    "perl",
    "php",
    "python",
    "ruby",
    "rust",
    "sql",
    "swift",
    "typescript",
    "xml",
    "yaml",
];

const CODE_LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("sh", "bash"),
    ("shell", "bash"),
    ("zsh", "bash"),
    ("console", "bash"),
    ("c++", "cpp"),
    ("cc", "cpp"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("c#", "csharp"),
    ("patch", "diff"),
    ("golang", "go"),
    ("htm", "html"),
    ("xhtml", "html"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("node", "javascript"),
    ("kt", "kotlin"),
    ("md", "markdown"),
    ("pl", "perl"),
    ("py", "python"),
    ("python3", "python"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("mysql", "sql"),
    ("pgsql", "sql"),
    ("postgresql", "sql"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("yml", "yaml"),
];

/// Structural fixup rules, in evaluation order. Code block bodies are left
/// as they are.
pub fn fixup_rules() -> Result<Vec<PatternRule>> {
    let code = code_bodies()?;
    let rules = vec![
        PatternRule::callback(
            "quote-attributes",
            r"(?i)\[quote(?:=([^\]]*)|\s+([^\]]*))?\]",
            rewrite_quote,
        )?,
        PatternRule::callback(
            "code-language",
            r#"(?i)\[code(?:=["']?([^\]"']*)["']?)?\]"#,
            rewrite_code,
        )?,
        PatternRule::callback(
            "alignment-open",
            r"(?i)\[(center|left|right|justify)\]",
            rewrite_alignment,
        )?,
        PatternRule::template("alignment-close", r"(?i)\[/(?:center|left|right|justify)\]", "[/align]")?,
        PatternRule::template(
            "youtube-id",
            r"(?i)\[youtube\]\s*([A-Za-z0-9_-]{6,})\s*\[/youtube\]",
            "[media]https://www.youtube.com/watch?v=${1}[/media]",
        )?,
        PatternRule::template(
            "video-tags",
            r"(?is)\[(?:youtube|video)(?:=[^\]]*)?\](.*?)\[/(?:youtube|video)\]",
            "[media]${1}[/media]",
        )?,
        PatternRule::template("image-attributes", r"(?i)\[img(?:=[^\]]*|\s+[^\]]*)\]", "[img]")?,
        PatternRule::callback(
            "font-size",
            r#"(?i)\[size=["']?(\d+)(?:px|pt)?["']?\]"#,
            rewrite_size,
        )?,
    ];
    Ok(rules.into_iter().map(|rule| rule.outside_code(&code)).collect())
}

/// Snap a requested size to the smallest accepted size that is at least as
/// large, or the largest accepted size when the request exceeds them all.
pub fn snap_font_size(requested: u32) -> u32 {
    ACCEPTED_FONT_SIZES
        .iter()
        .copied()
        .find(|&size| size >= requested)
        .unwrap_or(ACCEPTED_FONT_SIZES[ACCEPTED_FONT_SIZES.len() - 1])
}

/// Map a source language label to a canonical highlighter name.
pub fn canonical_language(label: &str) -> Option<&'static str> {
    let label = label.trim().to_ascii_lowercase();
    if let Some(found) = CODE_LANGUAGES.iter().find(|&&lang| lang == label) {
        return Some(found);
    }
    CODE_LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == label)
        .map(|(_, lang)| *lang)
}

fn rewrite_size(caps: &Captures<'_>, _: &RuleContext<'_>) -> String {
    let size = caps[1]
        .parse::<u32>()
        .map(snap_font_size)
        .unwrap_or(ACCEPTED_FONT_SIZES[ACCEPTED_FONT_SIZES.len() - 1]);
    format!("[size={size}]")
}

fn rewrite_code(caps: &Captures<'_>, _: &RuleContext<'_>) -> String {
    match caps.get(1).and_then(|m| canonical_language(m.as_str())) {
        Some(lang) => format!("[code={lang}]"),
        None => "[code]".to_string(),
    }
}

fn rewrite_alignment(caps: &Captures<'_>, _: &RuleContext<'_>) -> String {
    format!("[align={}]", caps[1].to_ascii_lowercase())
}

fn rewrite_quote(caps: &Captures<'_>, _: &RuleContext<'_>) -> String {
    let author = if let Some(value) = caps.get(1) {
        author_from_value(value.as_str())
    } else if let Some(attrs) = caps.get(2) {
        author_from_attributes(attrs.as_str())
    } else {
        None
    };
    match author {
        Some(name) if !name.is_empty() => {
            let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
            format!("[quote='{escaped}']")
        }
        _ => "[quote]".to_string(),
    }
}

/// Author from `[quote=VALUE]`.
///
/// Single-quoted values are the canonical form and are taken literally.
/// Double-quoted and bare values may carry post metadata after the name.
fn author_from_value(value: &str) -> Option<String> {
    let value = value.trim();
    if let Some(rest) = value.strip_prefix('\'') {
        return Some(read_single_quoted(rest));
    }
    if let Some(rest) = value.strip_prefix('"') {
        let inner = rest.split('"').next().unwrap_or_default();
        return Some(strip_post_metadata(inner));
    }
    let bare = value.split(';').next().unwrap_or_default();
    Some(strip_post_metadata(bare))
}

/// Author from `[quote author=… link=…]` style attributes.
fn author_from_attributes(attrs: &str) -> Option<String> {
    for key in ["author=", "name=", "username="] {
        let Some(pos) = attrs.to_ascii_lowercase().find(key) else {
            continue;
        };
        let rest = &attrs[pos + key.len()..];
        let value = if let Some(quoted) = rest.strip_prefix('"') {
            quoted.split('"').next().unwrap_or_default()
        } else if let Some(quoted) = rest.strip_prefix('\'') {
            quoted.split('\'').next().unwrap_or_default()
        } else {
            rest.split_whitespace().next().unwrap_or_default()
        };
        return Some(value.trim().to_string());
    }
    None
}

fn read_single_quoted(rest: &str) -> String {
    let mut out = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '\'' => break,
            _ => out.push(c),
        }
    }
    out
}

fn strip_post_metadata(name: &str) -> String {
    // "alice, post:3, topic:7" and "alice, full:true"
    let cut = [", post:", ", topic:", ", full:", ", username:"]
        .iter()
        .filter_map(|marker| name.find(marker))
        .min()
        .unwrap_or(name.len());
    name[..cut].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RulePipeline;
    use crate::resolver::NoAttachments;

    fn run(text: &str) -> String {
        let mut pipeline = RulePipeline::new();
        pipeline.extend(fixup_rules().unwrap());
        pipeline.apply(text, &RuleContext::new(&NoAttachments)).text
    }

    #[test]
    fn font_sizes_snap_up() {
        assert_eq!(snap_font_size(20), 24);
        assert_eq!(snap_font_size(50), 36);
        assert_eq!(snap_font_size(12), 12);
        assert_eq!(snap_font_size(1), 8);
        assert_eq!(run("[size=20]x[/size]"), "[size=24]x[/size]");
        assert_eq!(run("[size=\"50px\"]x[/size]"), "[size=36]x[/size]");
        assert_eq!(run("[size=99999999999]x[/size]"), "[size=36]x[/size]");
    }

    #[test]
    fn quote_metadata_is_dropped() {
        assert_eq!(run("[quote=\"alice, post:3, topic:7\"]x[/quote]"), "[quote='alice']x[/quote]");
        assert_eq!(run("[quote=bob;4411]x[/quote]"), "[quote='bob']x[/quote]");
        assert_eq!(
            run("[quote=\"carol\" post_id=12 time=1 user_id=5]x[/quote]"),
            "[quote='carol']x[/quote]"
        );
        assert_eq!(
            run("[quote author=dave link=topic=1.msg2#msg2 date=3]x[/quote]"),
            "[quote='dave']x[/quote]"
        );
        assert_eq!(run("[quote]x[/quote]"), "[quote]x[/quote]");
        assert_eq!(run("[quote=\"\"]x[/quote]"), "[quote]x[/quote]");
    }

    #[test]
    fn quote_author_escaping_is_stable() {
        let once = run("[quote=\"o'neil\"]x[/quote]");
        assert_eq!(once, "[quote='o\\'neil']x[/quote]");
        assert_eq!(run(&once), once);
    }

    #[test]
    fn code_languages_are_remapped() {
        assert_eq!(run("[code=js]x[/code]"), "[code=javascript]x[/code]");
        assert_eq!(run("[code=\"Rust\"]x[/code]"), "[code=rust]x[/code]");
        assert_eq!(run("[code=text]x[/code]"), "[code]x[/code]");
        assert_eq!(run("[code=brainfuck]x[/code]"), "[code]x[/code]");
        assert_eq!(canonical_language("C++"), Some("cpp"));
    }

    #[test]
    fn alignment_and_media() {
        assert_eq!(run("[CENTER]x[/center]"), "[align=center]x[/align]");
        assert_eq!(
            run("[youtube]dQw4w9WgXcQ[/youtube]"),
            "[media]https://www.youtube.com/watch?v=dQw4w9WgXcQ[/media]"
        );
        assert_eq!(
            run("[video=youtube]https://youtu.be/x[/video]"),
            "[media]https://youtu.be/x[/media]"
        );
    }

    #[test]
    fn image_attributes_are_dropped() {
        assert_eq!(run("[img=200x100]a.png[/img]"), "[img]a.png[/img]");
        assert_eq!(run("[img width=20 height=10]a.png[/img]"), "[img]a.png[/img]");
    }

    #[test]
    fn code_bodies_are_not_fixed_up() {
        assert_eq!(
            run("[size=20]a[/size][code=js][size=20]b[/size] [center]c[/center][/code]"),
            "[size=24]a[/size][code=javascript][size=20]b[/size] [center]c[/center][/code]"
        );
        assert_eq!(run("[code][quote=bob;1]x[/quote][/code]"), "[code][quote=bob;1]x[/quote][/code]");
    }

    #[test]
    fn canonical_constructs_are_left_alone() {
        let canonical = "[quote='alice']x[/quote][code=rust]y[/code][align=left]z[/align][size=18]w[/size][img]i.png[/img][media]m[/media]";
        assert_eq!(run(canonical), canonical);
    }
}
