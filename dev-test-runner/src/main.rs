//! Runs every `fixtures/*.json` through one decode pass.
//!
//! A fixture is `{ "env": {...}, "expect": {...} }` (the expected snapshot)
//! or `{ "env": {...}, "error": "<kind>" }`. An optional regex argument
//! restricts the run to fixtures whose file name matches.
use std::path::{Path, PathBuf};

use colored::Colorize;
use omniarg::path_de::from_str_with_path;
use omniarg::{decode_from, DecodeError, MapEnv};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
struct Fixture {
    env: Map<String, Value>,
    #[serde(default)]
    expect: Option<Map<String, Value>>,
    #[serde(default)]
    error: Option<String>,
}

fn error_kind(err: &DecodeError) -> &'static str {
    match err {
        DecodeError::ListMissing { .. } => "list_missing",
        DecodeError::TypeMissing { .. } => "type_missing",
        DecodeError::InvalidType { .. } => "invalid_type",
        DecodeError::Conversion { .. } => "conversion",
    }
}

fn run_fixture(path: &Path) -> Result<(), String> {
    let src = std::fs::read_to_string(path).map_err(|e| format!("read failed: {e}"))?;
    let fixture: Fixture = from_str_with_path(&src).map_err(|e| format!("bad fixture: {e}"))?;

    let env = fixture
        .env
        .iter()
        .map(|(k, v)| match v {
            Value::String(s) => Ok((k.clone(), s.clone())),
            other => Err(format!("env.{k}: expected a string, got {other}")),
        })
        .collect::<Result<MapEnv, _>>()?;

    match (decode_from(env), fixture.expect, fixture.error) {
        (Ok(store), Some(expect), None) => {
            let actual = store.snapshot();
            if actual == expect {
                Ok(())
            } else {
                Err(format!(
                    "snapshot mismatch\n  expected: {}\n  actual:   {}",
                    Value::Object(expect),
                    Value::Object(actual)
                ))
            }
        }
        (Err(err), None, Some(kind)) if error_kind(&err) == kind => Ok(()),
        (Err(err), None, Some(kind)) => Err(format!("expected {kind} error, got {}: {err}", error_kind(&err))),
        (Ok(store), None, Some(kind)) => Err(format!("expected {kind} error, decoded {}", Value::Object(store.snapshot()))),
        (Err(err), Some(_), None) => Err(format!("unexpected error: {err}")),
        _ => Err("fixture needs exactly one of \"expect\" or \"error\"".to_string()),
    }
}

fn main() {
    let filter = match std::env::args().nth(1).map(|p| Regex::new(&p)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("{} invalid filter: {error}", "error:".red());
            std::process::exit(2);
        }
    };

    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    let mut paths = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect::<Vec<_>>(),
        Err(error) => {
            eprintln!("{} cannot read {}: {error}", "error:".red(), dir.display());
            std::process::exit(2);
        }
    };
    paths.sort();

    let mut failed = 0usize;
    let mut ran = 0usize;
    for path in &paths {
        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        if filter.as_ref().is_some_and(|re| !re.is_match(&name)) {
            continue;
        }
        ran += 1;
        match run_fixture(path) {
            Ok(()) => eprintln!("{} {name}", "ok".green()),
            Err(reason) => {
                failed += 1;
                eprintln!("{} {name}\n  {reason}", "FAIL".red().bold());
            }
        }
    }

    eprintln!("{ran} fixtures, {failed} failed");
    if failed > 0 {
        std::process::exit(1);
    }
}
