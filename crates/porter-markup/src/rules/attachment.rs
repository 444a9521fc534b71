//! Embedded-upload resolution.
//!
//! Uploads are referenced from post bodies as `upload://TOKEN.ext`, where the
//! token is the base62 form of the file's SHA-1. A resolved reference becomes
//! an `[attach]` placeholder; anything else is removed outright. References
//! inside code blocks are left as written.

use regex::Captures;
use tracing::debug;

use porter_codec::base62;

use crate::error::Result;
use crate::rule::{code_bodies, PatternRule, RuleContext};

/// Byte width of the digest an upload token encodes.
pub const UPLOAD_DIGEST_LEN: usize = 20;

const TOKEN: &str = r#"upload://([^\s.\[\]'"()]+)(?:\.[A-Za-z0-9]+)?"#;

pub fn attachment_rules() -> Result<Vec<PatternRule>> {
    let code = code_bodies()?;
    let rules = vec![
        PatternRule::callback(
            "upload-image",
            &format!(r"\[img\]{TOKEN}\[/img\]"),
            resolve_upload,
        )?,
        PatternRule::callback(
            "upload-link",
            &format!(r#"(?s)\[url=['"]?{TOKEN}['"]?\].*?\[/url\]"#),
            resolve_upload,
        )?,
        PatternRule::callback("upload-bare", TOKEN, resolve_upload)?,
    ];
    Ok(rules.into_iter().map(|rule| rule.outside_code(&code)).collect())
}

fn resolve_upload(caps: &Captures<'_>, context: &RuleContext<'_>) -> String {
    let token = &caps[1];
    let digest = match base62::decode_digest_hex(token, UPLOAD_DIGEST_LEN) {
        Ok(digest) => digest,
        Err(e) => {
            debug!(token, error = %e, "dropping malformed upload reference");
            return String::new();
        }
    };
    match context.resolver.resolve(&digest) {
        Some(id) => format!("[attach={id}][/attach]"),
        None => {
            debug!(token, sha1 = %digest, "dropping unmatched upload reference");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RulePipeline;
    use crate::resolver::{AttachmentIndex, NoAttachments};
    use porter_types::SourceId;

    const SHA1: &str = "2fd4e1c67a2d28fced849ee1bb76e7391b93eb12";

    fn token() -> String {
        base62::encode_digest(&hex::decode(SHA1).unwrap())
    }

    fn run(text: &str, index: &AttachmentIndex) -> String {
        let mut pipeline = RulePipeline::new();
        pipeline.extend(attachment_rules().unwrap());
        pipeline.apply(text, &RuleContext::new(index)).text
    }

    fn index() -> AttachmentIndex {
        [(SHA1.to_string(), SourceId::Int(77))].into_iter().collect()
    }

    #[test]
    fn resolved_image_becomes_placeholder() {
        let text = format!("see [img]upload://{}.png[/img] here", token());
        assert_eq!(run(&text, &index()), "see [attach=77][/attach] here");
    }

    #[test]
    fn resolved_link_replaces_whole_anchor() {
        let text = format!("[url='upload://{}.pdf']manual.pdf|attachment[/url]", token());
        assert_eq!(run(&text, &index()), "[attach=77][/attach]");
    }

    #[test]
    fn unmatched_reference_leaves_no_trace() {
        let text = format!("a [img]upload://{}.png[/img] b", token());
        assert_eq!(run(&text, &AttachmentIndex::new()), "a  b");
    }

    #[test]
    fn malformed_token_is_removed() {
        assert_eq!(run("x upload://not-base62!.png y", &index()), "x  y");
        assert_eq!(run("x upload://zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz y", &index()), "x  y");
    }

    #[test]
    fn uploads_inside_code_are_kept() {
        let text = format!("[code]![x](upload://{t}.png)[/code] upload://{t}.png", t = token());
        assert_eq!(
            run(&text, &index()),
            format!("[code]![x](upload://{}.png)[/code] [attach=77][/attach]", token())
        );
    }

    #[test]
    fn text_without_uploads_is_untouched() {
        let mut pipeline = RulePipeline::new();
        pipeline.extend(attachment_rules().unwrap());
        let outcome = pipeline.apply("[attach=3][/attach] plain", &RuleContext::new(&NoAttachments));
        assert_eq!(outcome.text, "[attach=3][/attach] plain");
        assert!(outcome.applied.is_empty());
    }
}
