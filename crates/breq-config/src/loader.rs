//! YAML loading with `!include` and `!env_var`
//!
//! - `!include devices.yaml` splices in another document, resolved
//!   relative to the file containing the tag
//! - `!env_var BREQ_SETTLE_MS` substitutes an environment variable; the
//!   value is parsed as YAML so numbers stay numbers

use crate::error::{ConfigError, ConfigResult};
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub struct YamlLoader {
    /// Where relative top-level paths are resolved
    base_dir: PathBuf,
    /// Files being loaded, outermost first
    chain: Vec<PathBuf>,
}

impl YamlLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            chain: Vec::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Read `path` and resolve every tag in it
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = absolutize(&self.base_dir, path.as_ref());

        if self.chain.contains(&path) {
            let mut chain = self.chain.clone();
            chain.push(path);
            return Err(ConfigError::IncludeCycle { chain });
        }

        debug!(path = %path.display(), depth = self.chain.len(), "Loading YAML");
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        self.chain.push(path.clone());
        let loaded = self.load_string(&text, &path);
        self.chain.pop();
        loaded
    }

    /// Parse `text` as if it were the contents of `origin`
    pub fn load_string(&mut self, text: &str, origin: &Path) -> ConfigResult<Value> {
        let parsed: Value = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        self.resolve(parsed, origin)
    }

    fn resolve(&mut self, value: Value, origin: &Path) -> ConfigResult<Value> {
        Ok(match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged, origin)?,
            Value::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(|item| self.resolve(item, origin))
                    .collect::<ConfigResult<_>>()?,
            ),
            Value::Mapping(entries) => {
                let mut resolved = Mapping::with_capacity(entries.len());
                for (key, item) in entries {
                    resolved.insert(key, self.resolve(item, origin)?);
                }
                Value::Mapping(resolved)
            }
            scalar => scalar,
        })
    }

    fn resolve_tag(&mut self, tagged: TaggedValue, origin: &Path) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!(%tag, "Resolving tag");

        match (tag.as_str(), tagged.value) {
            ("!include", Value::String(target)) => {
                let dir = origin.parent().unwrap_or(&self.base_dir).to_path_buf();
                self.load_file(absolutize(&dir, Path::new(&target)))
            }
            ("!include", other) => Err(ConfigError::BadInclude {
                file: origin.to_path_buf(),
                reason: format!("expected a file name, found {:?}", other),
            }),
            ("!env_var", Value::String(name)) => {
                let raw = std::env::var(&name)
                    .map_err(|_| ConfigError::MissingEnvVar { name: name.clone() })?;
                debug!(var = %name, "Substituted environment variable");
                Ok(serde_yaml::from_str(&raw).unwrap_or(Value::String(raw)))
            }
            ("!env_var", _) => Err(ConfigError::Invalid {
                key: "!env_var".to_string(),
                reason: "expected a variable name".to_string(),
            }),
            _ => Err(ConfigError::UnsupportedTag { tag: tag.clone() }),
        }
    }
}

fn absolutize(dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

/// Load `file` (relative to `base_dir`) with tags resolved
pub fn load_yaml(base_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Value> {
    YamlLoader::new(base_dir).load_file(file)
}

/// Load YAML text as though it were the file `name` inside `base_dir`
pub fn load_yaml_string(
    base_dir: impl Into<PathBuf>,
    text: &str,
    name: &str,
) -> ConfigResult<Value> {
    let mut loader = YamlLoader::new(base_dir);
    let origin = loader.base_dir().join(name);
    loader.load_string(text, &origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, text: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    fn get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
        value.as_mapping().and_then(|m| m.get(key))
    }

    #[test]
    fn test_plain_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "breq.yaml", "settle_delay_ms: 50\n");

        let value = load_yaml(dir.path(), "breq.yaml").unwrap();
        assert_eq!(get(&value, "settle_delay_ms").and_then(Value::as_u64), Some(50));
    }

    #[test]
    fn test_include_resolves_next_to_including_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bench/devices.yaml", "- name: alpha\n- name: beta\n");
        write(dir.path(), "bench/breq.yaml", "devices: !include devices.yaml\n");

        let value = load_yaml(dir.path(), "bench/breq.yaml").unwrap();
        let devices = get(&value, "devices").and_then(Value::as_sequence).unwrap();
        assert_eq!(devices.len(), 2);
    }

    #[test]
    fn test_include_needs_a_string() {
        let result = load_yaml_string("/tmp", "devices: !include [a, b]\n", "breq.yaml");
        assert!(matches!(result, Err(ConfigError::BadInclude { .. })));
    }

    #[test]
    fn test_env_var_keeps_numbers_numeric() {
        std::env::set_var("BREQ_LOADER_TEST_TIMEOUT", "2500");
        let value = load_yaml_string(
            "/tmp",
            "command_timeout_ms: !env_var BREQ_LOADER_TEST_TIMEOUT\n",
            "breq.yaml",
        )
        .unwrap();
        std::env::remove_var("BREQ_LOADER_TEST_TIMEOUT");

        assert_eq!(
            get(&value, "command_timeout_ms").and_then(Value::as_u64),
            Some(2500)
        );
    }

    #[test]
    fn test_missing_env_var() {
        let result = load_yaml_string("/tmp", "x: !env_var BREQ_SURELY_UNSET_VAR\n", "breq.yaml");
        assert!(matches!(
            result,
            Err(ConfigError::MissingEnvVar { ref name }) if name == "BREQ_SURELY_UNSET_VAR"
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let result = load_yaml_string("/tmp", "x: !secret password\n", "breq.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedTag { .. })));
    }

    #[test]
    fn test_include_cycle_reports_chain() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.yaml", "b: !include b.yaml\n");
        write(dir.path(), "b.yaml", "a: !include a.yaml\n");

        match load_yaml(dir.path(), "a.yaml") {
            Err(ConfigError::IncludeCycle { chain }) => {
                assert_eq!(chain.len(), 3);
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("expected include cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = load_yaml(dir.path(), "nope.yaml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
