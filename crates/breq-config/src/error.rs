//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid YAML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `!include` whose argument is not a usable path
    #[error("bad !include in {file}: {reason}")]
    BadInclude { file: PathBuf, reason: String },

    /// Include chain that leads back to a file already being loaded
    #[error("include cycle: {}", format_chain(.chain))]
    IncludeCycle { chain: Vec<PathBuf> },

    #[error("environment variable {name} is not set")]
    MissingEnvVar { name: String },

    #[error("unsupported YAML tag {tag}")]
    UnsupportedTag { tag: String },

    /// A value with the wrong shape or type
    #[error("invalid `{key}`: {reason}")]
    Invalid { key: String, reason: String },

    #[error("device '{name}': {reason}")]
    Device { name: String, reason: String },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = ConfigError::IncludeCycle {
            chain: vec![
                PathBuf::from("a.yaml"),
                PathBuf::from("b.yaml"),
                PathBuf::from("a.yaml"),
            ],
        };
        assert_eq!(err.to_string(), "include cycle: a.yaml -> b.yaml -> a.yaml");
    }
}
