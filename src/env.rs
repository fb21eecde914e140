//! Read-only key/value sources the decoder pulls from.
//!
//! The host exports everything as environment variables; tests and the CLI
//! can substitute an in-memory map or a captured env file instead.
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::EnvFileError;

pub trait EnvSource {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<S: EnvSource + ?Sized> EnvSource for &S {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}

impl EnvSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// The real process environment. Values that are not valid UTF-8 read as
/// absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var_os(key)?.into_string().ok()
    }
}

// -------------------------------- MapEnv --------------------------------- //

/// Ordered in-memory environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnv {
    vars: IndexMap<String, String>,
}

static ENV_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*=(.*)$").expect("env line regex is valid")
});

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses an env dump: `KEY=VALUE` per line, `#` comments, optional
    /// `export ` prefix, optional matching quotes around the value.
    pub fn from_env_file_str(src: &str) -> Result<Self, EnvFileError> {
        let mut env = Self::new();
        env.merge_env_file_str(src, "<input>")?;
        Ok(env)
    }

    /// Same as [`MapEnv::from_env_file_str`], overriding existing keys.
    /// `origin` names the source in error messages.
    pub fn merge_env_file_str(&mut self, src: &str, origin: &str) -> Result<(), EnvFileError> {
        for (idx, line) in src.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let caps = ENV_LINE.captures(line).ok_or_else(|| EnvFileError::Malformed {
                origin: origin.to_string(),
                line: idx + 1,
                text: line.to_string(),
            })?;
            self.set(&caps[1], unquote(caps[2].trim()));
        }
        Ok(())
    }

    /// Loads and merges env files in order; later files win.
    pub fn load_files<I, P>(paths: I) -> Result<Self, EnvFileError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut env = Self::new();
        for path in paths {
            let path = path.as_ref();
            let src = std::fs::read_to_string(path).map_err(|source| EnvFileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            env.merge_env_file_str(&src, &path.display().to_string())?;
        }
        Ok(env)
    }
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted { &value[1..value.len() - 1] } else { value }
}

impl EnvSource for MapEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn env_file_lines_parse_with_quotes_comments_and_export() {
        let src = "# captured\nOMNI_ARG_LIST=name\n\nexport OMNI_ARG_NAME_TYPE = str\nOMNI_ARG_NAME_VALUE=\"hello world\"\nQUOTED='a=b'\n";
        let env = MapEnv::from_env_file_str(src).unwrap();
        assert_eq!(env.lookup("OMNI_ARG_LIST").as_deref(), Some("name"));
        assert_eq!(env.lookup("OMNI_ARG_NAME_TYPE").as_deref(), Some("str"));
        assert_eq!(env.lookup("OMNI_ARG_NAME_VALUE").as_deref(), Some("hello world"));
        assert_eq!(env.lookup("QUOTED").as_deref(), Some("a=b"));
        assert_eq!(env.len(), 4);
    }

    #[test]
    fn malformed_lines_report_their_position() {
        let err = MapEnv::from_env_file_str("A=1\nnot a pair\n").unwrap_err();
        match err {
            EnvFileError::Malformed { line, text, .. } => {
                assert_eq!(line, 2);
                assert_eq!(text, "not a pair");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.env");
        let second = dir.path().join("b.env");
        writeln!(std::fs::File::create(&first).unwrap(), "X=1\nY=1").unwrap();
        writeln!(std::fs::File::create(&second).unwrap(), "Y=2").unwrap();

        let env = MapEnv::load_files([&first, &second]).unwrap();
        assert_eq!(env.lookup("X").as_deref(), Some("1"));
        assert_eq!(env.lookup("Y").as_deref(), Some("2"));

        let missing = MapEnv::load_files([dir.path().join("nope.env")]);
        assert!(matches!(missing, Err(EnvFileError::Io { .. })));
    }

    #[test]
    fn references_and_std_maps_are_sources() {
        fn read(source: impl EnvSource) -> Option<String> {
            source.lookup("K")
        }
        let map: HashMap<String, String> = [("K".to_string(), "v".to_string())].into();
        assert_eq!(read(&map).as_deref(), Some("v"));
        let env = MapEnv::new().with("K", "w");
        assert_eq!(read(&env).as_deref(), Some("w"));
        assert_eq!(read(BTreeMap::<String, String>::new()), None);
    }
}
