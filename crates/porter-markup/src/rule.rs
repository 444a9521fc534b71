use std::borrow::Cow;
use std::fmt;

use regex::{Captures, Regex};

use crate::error::{MarkupError, Result};
use crate::resolver::AttachmentResolver;

// ---------------------------------------------------------------------------
// RuleContext
// ---------------------------------------------------------------------------

/// Collaborators available to every rule while a text is rewritten.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    /// Upload lookup used by the attachment rules.
    pub resolver: &'a dyn AttachmentResolver,
}

impl<'a> RuleContext<'a> {
    pub fn new(resolver: &'a dyn AttachmentResolver) -> Self {
        Self { resolver }
    }
}

impl fmt::Debug for RuleContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleContext").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RewriteRule trait
// ---------------------------------------------------------------------------

/// A single named, pure rewrite of markup text.
///
/// A rule must leave text it does not recognize untouched and must never
/// fail: unmatched or malformed input passes through unchanged.
///
/// The trait is object-safe and `Send + Sync` so rules can be stored in a
/// `Vec<Box<dyn RewriteRule>>`.
pub trait RewriteRule: Send + Sync {
    /// Stable name of the rule (e.g. "font-size").
    fn name(&self) -> &str;

    /// Rewrite `text`, borrowing it back when nothing changed.
    fn apply<'t>(&self, text: &'t str, context: &RuleContext<'_>) -> Cow<'t, str>;
}

// ---------------------------------------------------------------------------
// PatternRule
// ---------------------------------------------------------------------------

/// Callback computing the replacement for one match.
pub type RuleCallback = fn(&Captures<'_>, &RuleContext<'_>) -> String;

/// How a [`PatternRule`] rewrites each match.
#[derive(Clone, Copy)]
pub enum Replacement {
    /// A template with `${n}` group references.
    Template(&'static str),
    /// A function of the captures and the rule context.
    Callback(RuleCallback),
}

/// Code block bodies: group 1 is the text between `[code…]` and `[/code]`.
pub const CODE_BODY: &str = r"(?is)\[code(?:=[^\]]*)?\](.*?)\[/code\]";

/// Compile [`CODE_BODY`] for [`PatternRule::outside_code`].
pub fn code_bodies() -> Result<Regex> {
    Regex::new(CODE_BODY).map_err(|source| MarkupError::InvalidPattern {
        rule: "code-body".to_string(),
        source,
    })
}

/// A regular expression plus a replacement.
pub struct PatternRule {
    name: &'static str,
    pattern: Regex,
    replacement: Replacement,
    code_body: Option<Regex>,
}

impl PatternRule {
    /// Compile a rule.
    pub fn new(name: &'static str, pattern: &str, replacement: Replacement) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| MarkupError::InvalidPattern {
            rule: name.to_string(),
            source,
        })?;
        Ok(Self {
            name,
            pattern,
            replacement,
            code_body: None,
        })
    }

    /// Leave code block bodies untouched. The `[code…]` tags themselves are
    /// still rewritten, and no match spans a body.
    pub fn outside_code(mut self, code_bodies: &Regex) -> Self {
        self.code_body = Some(code_bodies.clone());
        self
    }

    /// Shorthand for a template rule.
    pub fn template(name: &'static str, pattern: &str, template: &'static str) -> Result<Self> {
        Self::new(name, pattern, Replacement::Template(template))
    }

    /// Shorthand for a callback rule.
    pub fn callback(name: &'static str, pattern: &str, callback: RuleCallback) -> Result<Self> {
        Self::new(name, pattern, Replacement::Callback(callback))
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    fn rewrite<'t>(&self, text: &'t str, context: &RuleContext<'_>) -> Cow<'t, str> {
        match self.replacement {
            Replacement::Template(template) => self.pattern.replace_all(text, template),
            Replacement::Callback(callback) => self
                .pattern
                .replace_all(text, |caps: &Captures<'_>| callback(caps, context)),
        }
    }
}

impl RewriteRule for PatternRule {
    fn name(&self) -> &str {
        self.name
    }

    fn apply<'t>(&self, text: &'t str, context: &RuleContext<'_>) -> Cow<'t, str> {
        let Some(code_body) = &self.code_body else {
            return self.rewrite(text, context);
        };

        let mut out = String::with_capacity(text.len());
        let mut changed = false;
        let mut last = 0;
        for caps in code_body.captures_iter(text) {
            let Some(body) = caps.get(1) else { continue };
            let outside = self.rewrite(&text[last..body.start()], context);
            changed |= matches!(outside, Cow::Owned(_));
            out.push_str(&outside);
            out.push_str(body.as_str());
            last = body.end();
        }
        if last == 0 {
            return self.rewrite(text, context);
        }
        let tail = self.rewrite(&text[last..], context);
        changed |= matches!(tail, Cow::Owned(_));
        out.push_str(&tail);

        if changed {
            Cow::Owned(out)
        } else {
            Cow::Borrowed(text)
        }
    }
}

impl<R: RewriteRule + ?Sized> RewriteRule for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply<'t>(&self, text: &'t str, context: &RuleContext<'_>) -> Cow<'t, str> {
        (**self).apply(text, context)
    }
}

impl fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("outside_code", &self.code_body.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NoAttachments;

    fn ctx() -> RuleContext<'static> {
        RuleContext::new(&NoAttachments)
    }

    #[test]
    fn template_rule_expands_groups() {
        let rule = PatternRule::template("bold", r"\*\*(.+?)\*\*", "[b]${1}[/b]").unwrap();
        assert_eq!(rule.apply("a **b** c", &ctx()), "a [b]b[/b] c");
        assert_eq!(rule.name(), "bold");
    }

    #[test]
    fn unmatched_text_is_borrowed() {
        let rule = PatternRule::template("bold", r"\*\*(.+?)\*\*", "[b]${1}[/b]").unwrap();
        assert!(matches!(rule.apply("plain", &ctx()), Cow::Borrowed("plain")));
    }

    #[test]
    fn callback_rule() {
        fn upper(caps: &Captures<'_>, _: &RuleContext<'_>) -> String {
            caps[1].to_uppercase()
        }
        let rule = PatternRule::callback("upper", r"<(\w+)>", upper).unwrap();
        assert_eq!(rule.apply("<abc> x", &ctx()), "ABC x");
    }

    #[test]
    fn code_bodies_are_skipped_but_tags_are_not() {
        let code = code_bodies().unwrap();
        let rule = PatternRule::template("js", r"js", "javascript").unwrap().outside_code(&code);
        assert_eq!(
            rule.apply("js [code=js]js[/code] js [CODE]js[/CODE]", &ctx()),
            "javascript [code=javascript]js[/code] javascript [CODE]js[/CODE]"
        );
        assert!(matches!(rule.apply("[code]js[/code]", &ctx()), Cow::Borrowed(_)));
        // An unclosed block is not a code body.
        assert_eq!(rule.apply("[code]js", &ctx()), "[code]javascript");
    }

    #[test]
    fn boxed_rules_delegate() {
        let rule: Box<dyn RewriteRule> =
            Box::new(PatternRule::template("bold", r"\*\*(.+?)\*\*", "[b]${1}[/b]").unwrap());
        assert_eq!(rule.name(), "bold");
        assert_eq!(RewriteRule::apply(&rule, "**x**", &ctx()), "[b]x[/b]");
    }

    #[test]
    fn bad_pattern_reports_rule_name() {
        let err = PatternRule::template("broken", r"(unclosed", "").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
