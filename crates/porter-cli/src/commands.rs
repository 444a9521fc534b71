use std::collections::BTreeMap;
use std::io::Read;

use anyhow::{bail, Context};
use colored::Colorize;
use num_bigint::BigUint;
use porter_codec::base62;
use porter_credential::rewrite;
use porter_markup::{NoAttachments, Transcoder};
use serde_json::json;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Transcode(args) => cmd_transcode(args, &cli.format),
        Command::Base62(args) => cmd_base62(args, &cli.format),
        Command::Credential(args) => cmd_credential(args, &cli.format),
    }
}

fn cmd_transcode(args: TranscodeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let raw = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("reading standard input")?;
            buf
        }
    };

    let transcoder = Transcoder::new()?;
    let outcome = transcoder.rewrite(args.dialect, &raw, &NoAttachments);
    debug!(dialect = %args.dialect, rules = ?outcome.applied, "transcoded");
    match format {
        OutputFormat::Text => println!("{}", outcome.text),
        OutputFormat::Json => println!(
            "{}",
            json!({ "dialect": args.dialect.as_str(), "text": outcome.text, "rules": outcome.applied })
        ),
    }
    Ok(())
}

fn cmd_base62(args: Base62Args, format: &OutputFormat) -> anyhow::Result<()> {
    let (input, output) = match args.action {
        Base62Action::Encode { number } => {
            let n = BigUint::parse_bytes(number.as_bytes(), 10)
                .with_context(|| format!("not a non-negative decimal integer: {number}"))?;
            (number, base62::encode(&n))
        }
        Base62Action::Decode { token, digest: Some(width) } => {
            let hex = base62::decode_digest_hex(&token, width)?;
            (token, hex)
        }
        Base62Action::Decode { token, digest: None } => {
            let n = base62::decode(&token)?;
            (token, n.to_str_radix(10))
        }
    };
    match format {
        OutputFormat::Text => println!("{output}"),
        OutputFormat::Json => println!("{}", json!({ "input": input, "output": output })),
    }
    Ok(())
}

fn cmd_credential(args: CredentialArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let params = parse_params(&args.params)?;
    let tagged = rewrite(&args.scheme, &args.hash, &args.salt, &params);
    let verified = match &args.check {
        Some(password) if !tagged.is_unresolved() => Some(tagged.verify(password)?),
        _ => None,
    };

    if let OutputFormat::Json = format {
        println!(
            "{}",
            json!({
                "tagged": tagged.to_string(),
                "scheme": tagged.scheme().map(|s| s.as_str()),
                "unresolved": tagged.is_unresolved(),
                "verified": verified,
            })
        );
        return Ok(());
    }

    if tagged.is_unresolved() {
        println!("{} {}", tagged.to_string().yellow().bold(), "(password reset required)".dimmed());
    } else {
        println!("{}", tagged.to_string().cyan());
    }
    match verified {
        Some(true) => println!("{} password matches", "✓".green().bold()),
        Some(false) => println!("{} password does not match", "✗".red().bold()),
        None if args.check.is_some() => println!("{} nothing to check against", "!".yellow()),
        None => {}
    }
    Ok(())
}

fn parse_params(raw: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    for entry in raw {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("parameter must be key=value: {entry}");
        };
        if key.is_empty() {
            bail!("parameter has an empty key: {entry}");
        }
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}
