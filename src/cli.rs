//! Inspection CLI: decode pass (inspect) | tag parser (tag) | naming (name)
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing::Level;

use omniarg::{
    arg_name_for, extract_and_parse_tag, parse_tag, ArgStore, Decoder, DecoderConfig, MapEnv, ProcessEnv,
    TagOptions, DEFAULT_PREFIX,
};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// inspect omniarg environments, tags and argument names
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log decode and bind events to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run one decode pass and print every argument with its type and value
    Inspect(InspectOut),
    /// parse a field tag and print its options
    Tag(TagOut),
    /// print the argument name each identifier binds to
    Name(NameOut),
}

#[derive(Args, Debug, Clone)]
struct InspectOut {
    /// captured KEY=VALUE files, literal paths or quoted glob patterns;
    /// the process environment is read when omitted
    #[arg(long, num_args = 1..)]
    env_file: Vec<String>,

    /// common key prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct TagOut {
    /// tag contents, or a full annotation when --namespace is given
    tag: String,

    /// extract this namespace from a full annotation first
    #[arg(long)]
    namespace: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct NameOut {
    #[arg(required = true)]
    idents: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        init_tracing(self.verbose);
        match &self.cmd {
            Command::Inspect(target) => target.run(),
            Command::Tag(target) => target.run(),
            Command::Name(target) => {
                for ident in &target.idents {
                    println!("{ident}\t{}", arg_name_for(ident));
                }
                Ok(())
            }
        }
    }
}

impl InspectOut {
    fn run(&self) -> anyhow::Result<()> {
        let config = DecoderConfig { prefix: self.prefix.clone() };
        let store = if self.env_file.is_empty() {
            Decoder::with_config(ProcessEnv, config).decode()
        } else {
            let paths = resolve_file_path_patterns(&self.env_file)?;
            let source = MapEnv::load_files(&paths).context("failed to load env files")?;
            Decoder::with_config(source, config).decode()
        }
        .context("decode failed")?;

        let report = serde_json::to_string_pretty(&Value::Object(describe(&store)))?;
        match self.out.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                std::fs::write(out, &report).with_context(|| format!("failed to write {}", out.display()))?;
            }
            None => println!("{report}"),
        }
        Ok(())
    }
}

impl TagOut {
    fn run(&self) -> anyhow::Result<()> {
        let options = match self.namespace.as_deref() {
            None => parse_tag(&self.tag)?,
            Some(ns) => match extract_and_parse_tag(&self.tag, ns)? {
                Some(options) => options,
                None => bail!("namespace {ns:?} not found in {:?}", self.tag),
            },
        };
        println!("{}", serde_json::to_string_pretty::<TagOptions>(&options)?);
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

/// `{ name: { "type": <raw descriptor>, "value": <snapshot value> } }`
fn describe(store: &ArgStore) -> Map<String, Value> {
    let snapshot = store.snapshot();
    store
        .names()
        .filter_map(|name| {
            let entry = store.entry(name)?;
            let value = snapshot.get(name).cloned().unwrap_or(Value::Null);
            Some((name.to_string(), json!({ "type": entry.descriptor.raw, "value": value })))
        })
        .collect()
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern {pattern}"))? {
                out.push(entry?);
            }
            if out.len() == before {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
