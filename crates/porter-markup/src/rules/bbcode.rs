//! Base rules for the BBCode family of dialects.
//!
//! Sources in this family already speak something close to the canonical
//! markup; the base stage only strips storage artifacts and normalizes
//! tag spelling.

use std::borrow::Cow;
use std::collections::HashSet;

use regex::{Captures, Regex};

use crate::error::{MarkupError, Result};
use crate::rule::{PatternRule, RewriteRule, RuleContext};

/// Strips phpBB storage uids from tags.
///
/// `[b:1a2b3c4d]` becomes `[b]`, `[quote="x":1a2b3c4d]` becomes
/// `[quote="x"]` and `[/list:u:1a2b3c4d]` becomes `[/list]`. A uid is only
/// recognized once the same text carries it on a tag without a value, so a
/// value such as `[url=mailto:abcde]` is left alone.
#[derive(Debug)]
pub struct PhpBbUids {
    bare: Regex,
    tagged: Regex,
}

impl PhpBbUids {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|source| MarkupError::InvalidPattern {
                rule: "phpbb-uid".to_string(),
                source,
            })
        };
        Ok(Self {
            bare: compile(r"\[/?(?:[a-zA-Z]+|\*)(?::[oum])?:([0-9a-z]{5,8})\]")?,
            tagged: compile(r"\[(/?(?:[a-zA-Z]+|\*))((?:=[^\]\[:]*)?)(?::[oum])?:([0-9a-z]{5,8})\]")?,
        })
    }
}

impl RewriteRule for PhpBbUids {
    fn name(&self) -> &str {
        "phpbb-uid"
    }

    fn apply<'t>(&self, text: &'t str, _context: &RuleContext<'_>) -> Cow<'t, str> {
        let uids: HashSet<&str> = self
            .bare
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();
        if uids.is_empty() {
            return Cow::Borrowed(text);
        }
        self.tagged.replace_all(text, |caps: &Captures<'_>| {
            if uids.contains(&caps[3]) {
                format!("[{}{}]", &caps[1], &caps[2])
            } else {
                caps[0].to_string()
            }
        })
    }
}

/// Base rules, in evaluation order.
pub fn base_rules() -> Result<Vec<Box<dyn RewriteRule>>> {
    Ok(vec![
        rule(PhpBbUids::new()?),
        rule(PatternRule::template(
            "phpbb-smiley",
            r#"<!-- s(\S+?) --><img [^>]*?/?><!-- s\S+? -->"#,
            "${1}",
        )?),
        rule(PatternRule::template(
            "phpbb-magic-url",
            r#"<!-- [mwel] --><a [^>]*?href="([^"]*)"[^>]*>(.*?)</a><!-- [mwel] -->"#,
            "[url='${1}']${2}[/url]",
        )?),
        rule(PatternRule::callback(
            "tag-case",
            r"(?i)\[(/?)(b|i|u|s|url|img|quote|code|icode|list|size|color|align|center|left|right|justify|youtube|video|media|spoiler|email|table|tr|td|hr|sub|sup)\b",
            lowercase_tag,
        )?),
        rule(PatternRule::template(
            "url-double-quoted",
            r#"\[url="([^"\]]*)"\]"#,
            "[url='${1}']",
        )?),
        rule(PatternRule::template(
            "url-unquoted",
            r#"\[url=([^\]'"\s][^\]]*)\]"#,
            "[url='${1}']",
        )?),
    ])
}

fn rule<R: RewriteRule + 'static>(rule: R) -> Box<dyn RewriteRule> {
    Box::new(rule)
}

fn lowercase_tag(caps: &Captures<'_>, _: &RuleContext<'_>) -> String {
    format!("[{}{}", &caps[1], caps[2].to_ascii_lowercase())
}
