use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use porter_markup::Dialect;

#[derive(Parser)]
#[command(
    name = "porter",
    about = "Forum migration toolkit: developer utilities",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Transcode a post body into canonical BBCode
    Transcode(TranscodeArgs),
    /// Encode or decode base62 tokens
    Base62(Base62Args),
    /// Rewrite a legacy password hash into its tagged form
    Credential(CredentialArgs),
}

#[derive(Args)]
pub struct TranscodeArgs {
    /// Source dialect: markdown, bbcode, html or canonical
    #[arg(short, long)]
    pub dialect: Dialect,
    /// Input file; standard input when omitted
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct Base62Args {
    #[command(subcommand)]
    pub action: Base62Action,
}

#[derive(Subcommand)]
pub enum Base62Action {
    /// Encode a non-negative decimal integer
    Encode { number: String },
    /// Decode a token to decimal
    Decode {
        token: String,
        /// Print as a hex digest of this many bytes (20 for upload tokens)
        #[arg(long)]
        digest: Option<usize>,
    },
}

#[derive(Args)]
pub struct CredentialArgs {
    #[arg(short, long)]
    pub scheme: String,
    #[arg(long)]
    pub hash: String,
    #[arg(long, default_value = "")]
    pub salt: String,
    /// Scheme parameter as key=value; repeatable
    #[arg(short, long = "param")]
    pub params: Vec<String>,
    /// Check a candidate password against the rewritten credential
    #[arg(long)]
    pub check: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_transcode() {
        let cli = Cli::try_parse_from(["porter", "transcode", "--dialect", "markdown", "post.md"]).unwrap();
        if let Command::Transcode(args) = cli.command {
            assert_eq!(args.dialect, Dialect::Markdown);
            assert_eq!(args.file, Some(PathBuf::from("post.md")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_transcode_rejects_unknown_dialect() {
        assert!(Cli::try_parse_from(["porter", "transcode", "-d", "textile"]).is_err());
    }

    #[test]
    fn parse_base62_decode_digest() {
        let cli = Cli::try_parse_from(["porter", "base62", "decode", "abc", "--digest", "20"]).unwrap();
        if let Command::Base62(Base62Args { action: Base62Action::Decode { token, digest } }) = cli.command {
            assert_eq!(token, "abc");
            assert_eq!(digest, Some(20));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_credential_params() {
        let cli = Cli::try_parse_from([
            "porter", "credential", "--scheme", "pbkdf2", "--hash", "abc",
            "-p", "digest=sha256", "--param", "iterations=1000",
        ]).unwrap();
        if let Command::Credential(args) = cli.command {
            assert_eq!(args.scheme, "pbkdf2");
            assert_eq!(args.salt, "");
            assert_eq!(args.params, vec!["digest=sha256", "iterations=1000"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verbose_json() {
        let cli = Cli::try_parse_from(["porter", "-v", "--format", "json", "base62", "encode", "61"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
