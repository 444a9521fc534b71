//! Base rules for raw HTML sources.
//!
//! Known structural tags are mapped onto canonical tags, everything else is
//! stripped, and character references are decoded last so decoded `<` never
//! looks like markup to the earlier rules.

use regex::Captures;

use crate::error::Result;
use crate::rule::{PatternRule, RuleContext};

pub fn base_rules() -> Result<Vec<PatternRule>> {
    let rules = [
        ("html-comment", r"(?s)<!--.*?-->", ""),
        ("html-break", r"(?i)<br\s*/?>", "\n"),
        ("html-paragraph-open", r"(?i)<p(?:\s[^>]*)?>", ""),
        ("html-paragraph-close", r"(?i)</p>", "\n\n"),
        ("html-bold", r"(?i)<(/?)(?:b|strong)(?:\s[^>]*)?>", "[${1}b]"),
        ("html-italic", r"(?i)<(/?)(?:i|em)(?:\s[^>]*)?>", "[${1}i]"),
        ("html-underline", r"(?i)<(/?)u(?:\s[^>]*)?>", "[${1}u]"),
        ("html-strike", r"(?i)<(/?)(?:s|strike|del)(?:\s[^>]*)?>", "[${1}s]"),
        (
            "html-code-block-lang",
            r#"(?i)<pre[^>]*>\s*<code[^>]*\bclass="[^"]*\blang(?:uage)?-([\w+#-]+)[^"]*"[^>]*>"#,
            "[code=${1}]",
        ),
        ("html-code-block-open", r"(?i)<pre[^>]*>\s*<code[^>]*>", "[code]"),
        ("html-code-block-close", r"(?i)</code>\s*</pre>", "[/code]"),
        ("html-pre", r"(?i)<(/?)pre(?:\s[^>]*)?>", "[${1}code]"),
        ("html-inline-code", r"(?i)<(/?)code(?:\s[^>]*)?>", "[${1}icode]"),
        ("html-link-open", r#"(?i)<a\s[^>]*?href="([^"]*)"[^>]*>"#, "[url='${1}']"),
        ("html-link-close", r"(?i)</a>", "[/url]"),
        ("html-image", r#"(?i)<img\s[^>]*?src="([^"]*)"[^>]*>"#, "[img]${1}[/img]"),
        ("html-blockquote", r"(?i)<(/?)blockquote(?:\s[^>]*)?>", "[${1}quote]"),
        ("html-unordered-list", r"(?i)<ul(?:\s[^>]*)?>", "[list]"),
        ("html-ordered-list", r"(?i)<ol(?:\s[^>]*)?>", "[list=1]"),
        ("html-list-close", r"(?i)</[uo]l>", "[/list]"),
        ("html-list-item", r"(?i)<li(?:\s[^>]*)?>", "[*]"),
        ("html-list-item-close", r"(?i)</li>", ""),
        ("html-heading-1", r"(?i)<h1(?:\s[^>]*)?>", "[size=24][b]"),
        ("html-heading-2", r"(?i)<h2(?:\s[^>]*)?>", "[size=18][b]"),
        ("html-heading-n", r"(?i)<h[3-6](?:\s[^>]*)?>", "[size=14][b]"),
        ("html-heading-close", r"(?i)</h[1-6]>", "[/b][/size]\n\n"),
        ("html-strip-tags", r"</?[a-zA-Z][^>]*>", ""),
    ];

    let mut out = Vec::with_capacity(rules.len() + 1);
    for (name, pattern, template) in rules {
        out.push(PatternRule::template(name, pattern, template)?);
    }
    out.push(PatternRule::callback(
        "html-entities",
        r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);",
        decode_entity,
    )?);
    Ok(out)
}

fn decode_entity(caps: &Captures<'_>, _: &RuleContext<'_>) -> String {
    let body = &caps[1];
    let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match body {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => None,
        }
    };
    match decoded {
        Some(ch) => ch.to_string(),
        None => caps[0].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RulePipeline;
    use crate::resolver::NoAttachments;

    fn run(text: &str) -> String {
        let mut pipeline = RulePipeline::new();
        pipeline.extend(base_rules().unwrap());
        pipeline.apply(text, &RuleContext::new(&NoAttachments)).text
    }

    #[test]
    fn inline_formatting() {
        assert_eq!(
            run("<p>a <strong>b</strong> <em>c</em> <del>d</del></p>"),
            "a [b]b[/b] [i]c[/i] [s]d[/s]\n\n"
        );
    }

    #[test]
    fn links_images_and_breaks() {
        assert_eq!(
            run(r#"<a href="https://x.org" rel="nofollow">x</a><br/><img src="/i.png" alt="i">"#),
            "[url='https://x.org']x[/url]\n[img]/i.png[/img]"
        );
    }

    #[test]
    fn code_blocks_keep_language() {
        assert_eq!(
            run(r#"<pre><code class="language-rust">fn main() {}</code></pre>"#),
            "[code=rust]fn main() {}[/code]"
        );
        assert_eq!(run("<pre>plain</pre>"), "[code]plain[/code]");
        assert_eq!(run("use <code>x</code>"), "use [icode]x[/icode]");
    }

    #[test]
    fn lists_and_quotes() {
        assert_eq!(
            run("<ul><li>a</li><li>b</li></ul>"),
            "[list][*]a[*]b[/list]"
        );
        assert_eq!(run("<blockquote>q</blockquote>"), "[quote]q[/quote]");
    }

    #[test]
    fn unknown_tags_are_stripped_and_entities_decoded() {
        assert_eq!(
            run("<span class=\"x\">a &amp; b &lt;c&gt; &#39;d&#x27; &bogus;</span>"),
            "a & b <c> 'd' &bogus;"
        );
    }

    #[test]
    fn entities_decode_in_a_single_pass() {
        assert_eq!(run("&amp;lt;"), "&lt;");
    }

    #[test]
    fn comments_are_removed() {
        assert_eq!(run("a<!-- hidden\n -->b"), "ab");
    }
}
