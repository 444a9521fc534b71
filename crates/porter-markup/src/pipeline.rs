use std::borrow::Cow;

use crate::rule::{RewriteRule, RuleContext};

/// The outcome of running a text through a [`RulePipeline`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// The rewritten text.
    pub text: String,
    /// Names of the rules that changed the text, in evaluation order.
    pub applied: Vec<String>,
}

/// An ordered list of independent rewrite rules.
///
/// Rules run strictly in list order, each on the previous rule's output.
/// There is no other coupling between rules.
#[derive(Default)]
pub struct RulePipeline {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl RulePipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule to the end of the pipeline.
    pub fn add_rule(&mut self, rule: Box<dyn RewriteRule>) {
        self.rules.push(rule);
    }

    /// Append several rules, keeping their order.
    pub fn extend<R, I>(&mut self, rules: I)
    where
        R: RewriteRule + 'static,
        I: IntoIterator<Item = R>,
    {
        for rule in rules {
            self.rules.push(Box::new(rule));
        }
    }

    /// Number of rules in the pipeline.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run `text` through every rule.
    pub fn apply(&self, text: &str, context: &RuleContext<'_>) -> RewriteOutcome {
        let mut current = text.to_string();
        let mut applied = Vec::new();

        for rule in &self.rules {
            let rewritten = match rule.apply(&current, context) {
                Cow::Borrowed(_) => None,
                Cow::Owned(next) => Some(next),
            };
            if let Some(next) = rewritten {
                if next != current {
                    applied.push(rule.name().to_string());
                    current = next;
                }
            }
        }

        RewriteOutcome {
            text: current,
            applied,
        }
    }
}

impl std::fmt::Debug for RulePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulePipeline")
            .field("rules", &self.rule_names())
            .finish()
    }
}
