//! Configuration parser for loading and merging configuration layers.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling. CLI flags are applied
//! last by the command layer.

use crate::error::{ConfigError, DeployError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::{DeployConfig, ParametersConfig};

/// Environment variables consulted for each setting, highest priority first.
///
/// The `INPUT_*` names follow the action-runner convention, where every
/// declared input reaches the process as `INPUT_<NAME>`.
const STACK_NAME_VARS: &[&str] = &["STACK_DEPLOY_STACK_NAME", "INPUT_STACK-NAME"];
const TEMPLATE_VARS: &[&str] = &["STACK_DEPLOY_TEMPLATE", "INPUT_TEMPLATE"];
const CAPABILITIES_VARS: &[&str] = &["STACK_DEPLOY_CAPABILITIES", "INPUT_CAPABILITIES"];
const PARAMETERS_VARS: &[&str] = &["STACK_DEPLOY_PARAMETERS", "INPUT_PARAMETERS"];
const REGION_VARS: &[&str] = &["STACK_DEPLOY_REGION", "AWS_REGION"];
const INTERVAL_VARS: &[&str] = &["STACK_DEPLOY_POLL_INTERVAL"];
const TIMEOUT_VARS: &[&str] = &["STACK_DEPLOY_TIMEOUT"];
const DEBUG_VARS: &[&str] = &["STACK_DEPLOY_DEBUG", "INPUT_DEBUG"];

/// Configuration parser for loading deployment configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Returns the base path, defaulting to the current directory.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        self.base_path.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(DeployError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeployConfig> {
        debug!("Parsing YAML configuration");

        // An empty document is a valid, fully defaulted configuration.
        if content.trim().is_empty() {
            return Ok(DeployConfig::default());
        }

        let config: DeployConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            DeployError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed configuration for stack: {}", config.stack.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// With no path, starts from the defaults. Environment variables are
    /// checked in the format `STACK_DEPLOY_<KEY>` (e.g. `STACK_DEPLOY_STACK_NAME`),
    /// falling back to the `INPUT_<NAME>` action inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// is malformed.
    pub fn load_with_env(&self, path: Option<&Path>) -> Result<DeployConfig> {
        let mut config = match path {
            Some(path) => self.load_file(path)?,
            None => DeployConfig::default(),
        };

        Self::apply_overrides_from(&mut config, |name| std::env::var(name).ok())?;

        Ok(config)
    }

    /// Applies overrides read through `lookup` to the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse or a parameter
    /// token lacks `=`.
    pub fn apply_overrides_from<F>(config: &mut DeployConfig, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&'static str]| -> Option<(&'static str, String)> {
            names
                .iter()
                .find_map(|name| lookup(name).map(|value| (*name, value)))
        };

        if let Some((var, name)) = first(STACK_NAME_VARS) {
            debug!("Overriding stack.name from {var}");
            config.stack.name = name.trim().to_string();
        }

        if let Some((var, template)) = first(TEMPLATE_VARS) {
            debug!("Overriding stack.template from {var}");
            config.stack.template = template.trim().to_string();
        }

        if let Some((var, capabilities)) = first(CAPABILITIES_VARS) {
            debug!("Overriding stack.capabilities from {var}");
            config.stack.capabilities = parse_capabilities(&capabilities);
        }

        if let Some((var, parameters)) = first(PARAMETERS_VARS) {
            debug!("Overriding stack.parameters from {var}");
            config.stack.parameters = parse_parameters(&parameters)?;
        }

        if let Some((var, region)) = first(REGION_VARS) {
            debug!("Overriding stack.region from {var}");
            config.stack.region = Some(region);
        }

        if let Some((var, interval)) = first(INTERVAL_VARS) {
            debug!("Overriding polling.interval_secs from {var}");
            config.polling.interval_secs = parse_secs(var, &interval)?;
        }

        if let Some((var, timeout)) = first(TIMEOUT_VARS) {
            debug!("Overriding polling.timeout_secs from {var}");
            config.polling.timeout_secs = Some(parse_secs(var, &timeout)?);
        }

        Ok(())
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self.base_path().join(".env");

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                DeployError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Reads the .env file into a map without touching the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be parsed.
    pub fn read_dotenv(&self) -> Result<HashMap<String, String>> {
        let env_path = self.base_path().join(".env");
        if !env_path.exists() {
            return Ok(HashMap::new());
        }

        let to_error = |e: dotenvy::Error| {
            DeployError::Config(ConfigError::ParseError {
                message: format!("Failed to read .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })
        };

        dotenvy::from_path_iter(&env_path)
            .map_err(&to_error)?
            .map(|item| item.map_err(&to_error))
            .collect()
    }
}

/// Splits a whitespace-separated capability list.
///
/// An empty or all-blank string yields no capabilities.
#[must_use]
pub fn parse_capabilities(input: &str) -> Vec<String> {
    input.split_whitespace().map(String::from).collect()
}

/// Parses whitespace-separated `Key=Value` pairs.
///
/// # Errors
///
/// Returns an error if any token lacks `=`.
pub fn parse_parameters(input: &str) -> Result<ParametersConfig> {
    let tokens: Vec<String> = input.split_whitespace().map(String::from).collect();

    if let Some(token) = tokens.iter().find(|token| !token.contains('=')) {
        return Err(ConfigError::InvalidParameter {
            token: token.clone(),
        }
        .into());
    }

    Ok(ParametersConfig::List(tokens))
}

/// Returns true if debug logging was requested through the environment.
///
/// Consulted before any configuration is loaded, so logging is set up first.
pub fn debug_requested<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    DEBUG_VARS
        .iter()
        .find_map(|name| lookup(name))
        .is_some_and(|flag| parse_flag(&flag))
}

/// Parses a switch value: anything non-blank is on, except an explicit "off" spelling.
fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    !value.is_empty() && !matches!(value.as_str(), "0" | "false" | "no" | "off")
}

/// Parses a number of seconds from an environment variable.
fn parse_secs(var: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        ConfigError::validation(format!("'{value}' is not a number of seconds"), var).into()
    })
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "stack-deploy.yaml",
    "stack-deploy.yml",
    ".stack-deploy.yaml",
    ".stack-deploy.yml",
];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(DeployError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
stack:
  name: web
  template: stack.yaml
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).expect("parse failed");

        assert_eq!(config.stack.name, "web");
        assert_eq!(config.stack.template, "stack.yaml");
        assert_eq!(config.polling.interval_secs, 10);
        assert!(config.stack.capabilities.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
stack:
  name: web-prod
  template: s3://templates/web.yaml
  region: eu-west-1
  capabilities:
    - CAPABILITY_IAM
    - CAPABILITY_AUTO_EXPAND
  parameters:
    Env: prod
    InstanceCount: 3

polling:
  interval_secs: 5
  timeout_secs: 1800
"#;
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).expect("parse failed");

        assert_eq!(config.stack.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.stack.capabilities.len(), 2);
        assert_eq!(config.polling.interval_secs, 5);
        assert_eq!(config.polling.timeout_secs, Some(1800));

        let params = config
            .stack
            .parameters
            .to_stack_parameters()
            .expect("parameters failed");
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].value, "3");
    }

    #[test]
    fn test_parse_list_parameters() {
        let yaml = r"
stack:
  name: web
  template: stack.yaml
  parameters:
    - Env=prod
    - Url=https://example.com/?a=b
";
        let config = ConfigParser::new().parse_yaml(yaml, None).expect("parse failed");
        let params = config
            .stack
            .parameters
            .to_stack_parameters()
            .expect("parameters failed");

        assert_eq!(params[1].key, "Url");
        assert_eq!(params[1].value, "https://example.com/?a=b");
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = ConfigParser::new().parse_yaml("stack: [unclosed", None);
        assert!(matches!(
            result,
            Err(DeployError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = ConfigParser::new().parse_yaml("  \n", None).expect("parse failed");
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_action_inputs_override_file() {
        let mut config = DeployConfig::default();
        config.stack.name = String::from("from-file");

        ConfigParser::apply_overrides_from(
            &mut config,
            lookup(&[
                ("INPUT_STACK-NAME", "from-input"),
                ("INPUT_TEMPLATE", "infra/stack.yaml"),
                ("INPUT_CAPABILITIES", "  CAPABILITY_IAM   CAPABILITY_NAMED_IAM "),
                ("INPUT_PARAMETERS", "Env=prod Tier=web"),
            ]),
        )
        .expect("overrides failed");

        assert_eq!(config.stack.name, "from-input");
        assert_eq!(config.stack.template, "infra/stack.yaml");
        assert_eq!(config.stack.capabilities, ["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"]);
        assert_eq!(
            config.stack.parameters,
            ParametersConfig::List(vec![String::from("Env=prod"), String::from("Tier=web")])
        );
    }

    #[test]
    fn test_debug_requested() {
        assert!(debug_requested(lookup(&[("INPUT_DEBUG", "true")])));
        assert!(debug_requested(lookup(&[("STACK_DEPLOY_DEBUG", "1")])));
        assert!(debug_requested(lookup(&[("INPUT_DEBUG", "verbose")])));
        assert!(!debug_requested(lookup(&[("INPUT_DEBUG", "false")])));
        assert!(!debug_requested(lookup(&[("INPUT_DEBUG", "OFF")])));
        assert!(!debug_requested(lookup(&[("INPUT_DEBUG", "  ")])));
        assert!(!debug_requested(lookup(&[])));
    }

    #[test]
    fn test_debug_switch_read_from_dotenv() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join(".env"), "INPUT_DEBUG=please\nOTHER=1\n")
            .expect("Failed to write .env");

        let vars = ConfigParser::new()
            .with_base_path(temp_dir.path())
            .read_dotenv()
            .expect("read failed");

        assert_eq!(vars.get("OTHER").map(String::as_str), Some("1"));
        assert!(debug_requested(|name| vars.get(name).cloned()));
    }

    #[test]
    fn test_missing_dotenv_reads_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let vars = ConfigParser::new()
            .with_base_path(temp_dir.path())
            .read_dotenv()
            .expect("read failed");
        assert!(vars.is_empty());
    }

    #[test]
    fn test_native_vars_win_over_action_inputs() {
        let mut config = DeployConfig::default();

        ConfigParser::apply_overrides_from(
            &mut config,
            lookup(&[
                ("STACK_DEPLOY_STACK_NAME", "native"),
                ("INPUT_STACK-NAME", "input"),
                ("STACK_DEPLOY_TIMEOUT", "600"),
            ]),
        )
        .expect("overrides failed");

        assert_eq!(config.stack.name, "native");
        assert_eq!(config.polling.timeout_secs, Some(600));
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut config = DeployConfig::default();
        let result = ConfigParser::apply_overrides_from(
            &mut config,
            lookup(&[("STACK_DEPLOY_POLL_INTERVAL", "soon")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_capabilities() {
        assert!(parse_capabilities("").is_empty());
        assert!(parse_capabilities("   ").is_empty());
        assert_eq!(parse_capabilities(" CAPABILITY_IAM "), ["CAPABILITY_IAM"]);
    }

    #[test]
    fn test_parse_parameters_rejects_bare_token() {
        let err = parse_parameters("Env=prod Broken").expect_err("bare token must fail");
        assert!(matches!(
            err,
            DeployError::Config(ConfigError::InvalidParameter { ref token }) if token == "Broken"
        ));
        assert!(parse_parameters("").expect("empty is fine").is_empty());
    }

    #[test]
    fn test_find_config_file_searches_upward() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("Failed to create dirs");
        std::fs::write(temp_dir.path().join("stack-deploy.yaml"), "stack:\n  name: web\n")
            .expect("Failed to write config");

        let found = find_config_file(&nested).expect("config not found");
        assert_eq!(found, temp_dir.path().join("stack-deploy.yaml"));

        let config = ConfigParser::new().load_file(&found).expect("load failed");
        assert_eq!(config.stack.name, "web");
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let result = ConfigParser::new().load_file(temp_dir.path().join("missing.yaml"));
        assert!(matches!(
            result,
            Err(DeployError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
