//! Session configuration loading.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ProbeError;
use crate::probe::ContinuationPolicy;
use crate::render::OutputFormat;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Policy for probes whose definition omits `policy`.
    pub default_policy: ContinuationPolicy,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Record file; standard output when absent.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    session: RawSession,
    #[serde(default)]
    output: RawOutput,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSession {
    default_policy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutput {
    format: Option<String>,
    path: Option<PathBuf>,
}

impl SessionConfig {
    /// Load a TOML config file. Relative output paths resolve against the
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProbeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ProbeError::InvalidConfig(format!("failed to read {}: {err}", path.display()).into())
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let (Some(output), Some(base)) = (config.output.path.as_mut(), path.parent()) {
            if output.is_relative() {
                *output = base.join(&*output);
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ProbeError> {
        let raw: RawConfig = toml::from_str(text)
            .map_err(|err| ProbeError::InvalidConfig(err.to_string().into()))?;
        let default_policy = match raw.session.default_policy {
            Some(text) => text.parse::<ContinuationPolicy>().map_err(|_| {
                ProbeError::InvalidConfig(format!("invalid session.default_policy '{text}'").into())
            })?,
            None => ContinuationPolicy::default(),
        };
        let format = match raw.output.format {
            Some(text) => parse_format(&text)?,
            None => OutputFormat::default(),
        };
        Ok(Self {
            default_policy,
            output: OutputConfig {
                format,
                path: raw.output.path,
            },
        })
    }
}

fn parse_format(text: &str) -> Result<OutputFormat, ProbeError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        _ => Err(ProbeError::InvalidConfig(
            format!("invalid output.format '{text}'").into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(SessionConfig::from_toml_str("").unwrap(), SessionConfig::default());
    }

    #[test]
    fn parses_all_fields() {
        let config = SessionConfig::from_toml_str(
            "[session]\ndefault_policy = \"resume-unless-error\"\n\n[output]\nformat = \"json\"\npath = \"probes.log\"\n",
        )
        .unwrap();
        assert_eq!(config.default_policy, ContinuationPolicy::ResumeUnlessError);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.path, Some(PathBuf::from("probes.log")));
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(matches!(
            SessionConfig::from_toml_str("[session]\ndefault_policy = \"sometimes\"\n"),
            Err(ProbeError::InvalidConfig(_))
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("[output]\nformat = \"xml\"\n"),
            Err(ProbeError::InvalidConfig(_))
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("[output]\ncolour = true\n"),
            Err(ProbeError::InvalidConfig(_))
        ));
    }
}
