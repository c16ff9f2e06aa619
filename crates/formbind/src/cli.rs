#![forbid(unsafe_code)]

//! Command-line interface.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use formbind_parts::walk;
use serde_json::Value;

use crate::config::SessionConfig;
use crate::document::{Document, DocumentFile};
use crate::error::{FormbindError, Result};
use crate::session::Session;

#[derive(Debug, Parser)]
#[command(
    name = "formbind",
    about = "Declarative settings forms bound to a reactive store",
    version
)]
pub struct Cli {
    /// Session configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log at debug level, ignoring FORMBIND_LOG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a document and build its form without output
    Check {
        document: PathBuf,
    },
    /// Print the built form as an outline
    Show {
        document: PathBuf,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Write the resulting settings as JSON
    Save {
        document: PathBuf,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Destination settings file
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Render the document's output templates
    Export {
        document: PathBuf,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Directory receiving the rendered files
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
    },
}

#[derive(Debug, Default, Args)]
pub struct SettingsArgs {
    /// Settings file applied over the document defaults
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Assign a value after loading; VALUE is JSON or a plain string
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub assignments: Vec<String>,
}

/// Split `KEY=VALUE`. The value is parsed as JSON, falling back to a string.
pub fn parse_assignment(text: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = text.split_once('=') else {
        return Err(FormbindError::InvalidAssignment(text.to_owned()));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(FormbindError::InvalidAssignment(text.to_owned()));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
    Ok((key.to_owned(), value))
}

fn session_config(cli: &Cli) -> Result<SessionConfig> {
    match &cli.config {
        Some(path) => Ok(SessionConfig::load(path)?),
        None => Ok(SessionConfig::default()),
    }
}

fn apply_settings(session: &Session, args: &SettingsArgs) -> Result<()> {
    // Reject malformed assignments before touching the store.
    let assignments = args
        .assignments
        .iter()
        .map(|text| parse_assignment(text))
        .collect::<Result<Vec<_>>>()?;
    if let Some(path) = &args.settings {
        session.load(path)?;
    }
    for (key, value) in assignments {
        session.set(key.as_str(), value)?;
    }
    Ok(())
}

fn open(config: SessionConfig, path: &Path) -> Result<(Session, DocumentFile)> {
    let document = DocumentFile::load(path)?;
    let (mut session, _) = Session::headless(config);
    session.open(&document)?;
    Ok((session, document))
}

/// Execute `cli`, writing user-facing output to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let config = session_config(cli)?;
    match &cli.command {
        Command::Check { document } => {
            let (session, file) = open(config, document)?;
            let mut parts = 0usize;
            if let Some(tree) = session.tree() {
                walk(tree, &mut |_, _| parts += 1);
            }
            writeln!(
                out,
                "{}: ok ({parts} parts, {} settings, {} outputs)",
                file.title(),
                session.store().len(),
                file.outputs().len()
            )?;
        }
        Command::Show { document, settings } => {
            let file = DocumentFile::load(document)?;
            let (mut session, surface) = Session::headless(config);
            session.open(&file)?;
            apply_settings(&session, settings)?;
            writeln!(out, "# {}", file.title())?;
            write!(out, "{}", surface.borrow())?;
        }
        Command::Save {
            document,
            settings,
            out: target,
        } => {
            let (session, _) = open(config, document)?;
            apply_settings(&session, settings)?;
            session.save(target)?;
            writeln!(out, "saved {}", target.display())?;
        }
        Command::Export {
            document,
            settings,
            out: dir,
        } => {
            let (session, _) = open(config, document)?;
            apply_settings(&session, settings)?;
            for path in session.export(dir)? {
                writeln!(out, "wrote {}", path.display())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignment_values_parse_as_json_or_text() {
        assert_eq!(parse_assignment("port=8080").unwrap(), ("port".into(), json!(8080)));
        assert_eq!(parse_assignment("a.b=true").unwrap(), ("a.b".into(), json!(true)));
        assert_eq!(
            parse_assignment("host=example.org").unwrap(),
            ("host".into(), json!("example.org"))
        );
        assert_eq!(parse_assignment("motd=a=b").unwrap(), ("motd".into(), json!("a=b")));
        assert_eq!(parse_assignment("empty=").unwrap(), ("empty".into(), json!("")));
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        for text in ["port", "=1", " =1"] {
            assert!(matches!(
                parse_assignment(text).unwrap_err(),
                FormbindError::InvalidAssignment(_)
            ));
        }
    }

    #[test]
    fn repeated_set_flags_collect() {
        let cli = Cli::try_parse_from([
            "formbind", "save", "doc.toml", "--out", "s.json", "--set", "a=1", "--set", "b=2", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Save { settings, .. } => assert_eq!(settings.assignments, ["a=1", "b=2"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
