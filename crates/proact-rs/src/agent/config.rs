//! Configuration for building a tool registry and scheduler.
//!
//! Everything has a working default. Override settings with the builder
//! methods, or read them from the environment with
//! [`OrchestratorConfig::from_env`].
//!
//! ```ignore
//! let config = OrchestratorConfig::default()
//!     .with_mode(ToolMode::Sandbox)
//!     .with_validate_args(true);
//! let registry = config.build_registry()?;
//! let normalizers = config.build_normalizers();
//! let outcome = config.scheduler(&registry, &normalizers).run(&plan, Memory::new()).await;
//! ```

use crate::agent::memory::{Promotion, default_promotions};
use crate::agent::resolve::{DEFAULT_TIME_PARAMETERS, ParameterResolver};
use crate::agent::scheduler::Scheduler;
use crate::tools::core::ToolRegistry;
use crate::tools::live::{DEFAULT_HTTP_TIMEOUT, DEFAULT_USER_AGENT, LiveTools, LiveToolsConfig};
use crate::tools::normalize::NormalizerRegistry;
use crate::tools::sandbox::SandboxTools;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

pub const MODE_ENV: &str = "APP_MODE";
pub const LOCATIONIQ_KEY_ENV: &str = "LOCATIONIQ_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown mode '{0}', must be one of [live, sandbox]")]
    UnknownMode(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Which implementations back the built-in tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolMode {
    /// Real clock and web APIs for the context tools, canned responses for
    /// the rest.
    #[default]
    Live,
    /// Canned responses for every tool.
    Sandbox,
}

impl ToolMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolMode::Live => "live",
            ToolMode::Sandbox => "sandbox",
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(ToolMode::Live),
            "sandbox" => Ok(ToolMode::Sandbox),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub mode: ToolMode,
    /// Parameter names whose phrase values become date windows.
    pub time_parameters: Vec<String>,
    /// Normalized fields copied into memory aliases.
    pub promotions: Vec<Promotion>,
    /// Check arguments against each tool's JSON schema before dispatch.
    pub validate_args: bool,
    pub locationiq_key: Option<String>,
    pub http_timeout: Duration,
    pub user_agent: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            mode: ToolMode::default(),
            time_parameters: DEFAULT_TIME_PARAMETERS.iter().map(|s| s.to_string()).collect(),
            promotions: default_promotions(),
            validate_args: false,
            locationiq_key: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overlaid with `APP_MODE` and `LOCATIONIQ_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(MODE_ENV) {
            match raw.parse() {
                Ok(mode) => config.mode = mode,
                Err(e) => warn!("{e}; using {}", config.mode),
            }
        }
        config.locationiq_key = lookup(LOCATIONIQ_KEY_ENV).filter(|k| !k.trim().is_empty());
        config
    }

    pub fn with_mode(mut self, mode: ToolMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_time_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_parameters = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_promotions(mut self, promotions: Vec<Promotion>) -> Self {
        self.promotions = promotions;
        self
    }

    pub fn with_validate_args(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    pub fn with_locationiq_key(mut self, key: impl Into<String>) -> Self {
        self.locationiq_key = Some(key.into());
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn live_tools_config(&self) -> LiveToolsConfig {
        LiveToolsConfig {
            locationiq_key: self.locationiq_key.clone(),
            timeout: self.http_timeout,
            user_agent: self.user_agent.clone(),
        }
    }

    /// Register the built-in tools for the configured mode.
    ///
    /// In live mode the sandbox module only contributes the tools that have
    /// no live implementation, so nothing is overridden.
    pub fn build_registry(&self) -> Result<ToolRegistry, ConfigError> {
        let registry = ToolRegistry::new().with_arg_validation(self.validate_args);
        let registry = match self.mode {
            ToolMode::Sandbox => registry.with_module(&SandboxTools::new()),
            ToolMode::Live => {
                let live = LiveTools::new(&self.live_tools_config())?;
                registry
                    .with_module(&SandboxTools::without(LiveTools::tool_names()))
                    .with_module(&live)
            }
        };
        debug!("Built {} registry with {} tool(s)", self.mode, registry.len());
        Ok(registry)
    }

    pub fn build_normalizers(&self) -> NormalizerRegistry {
        NormalizerRegistry::with_defaults()
    }

    pub fn build_resolver(&self) -> ParameterResolver {
        ParameterResolver::new(self.time_parameters.iter().cloned())
    }

    /// A scheduler wired with this configuration's resolver and promotions.
    pub fn scheduler<'a>(
        &self,
        registry: &'a ToolRegistry,
        normalizers: &'a NormalizerRegistry,
    ) -> Scheduler<'a> {
        Scheduler::new(registry, normalizers)
            .with_resolver(self.build_resolver())
            .with_promotions(self.promotions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::names;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("sandbox".parse::<ToolMode>().unwrap(), ToolMode::Sandbox);
        assert_eq!(" LIVE ".parse::<ToolMode>().unwrap(), ToolMode::Live);
        let err = "dry-run".parse::<ToolMode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown mode 'dry-run', must be one of [live, sandbox]"
        );
    }

    #[test]
    fn env_overrides() {
        let config = OrchestratorConfig::from_lookup(lookup(&[
            (MODE_ENV, "sandbox"),
            (LOCATIONIQ_KEY_ENV, "pk.test"),
        ]));
        assert_eq!(config.mode, ToolMode::Sandbox);
        assert_eq!(config.locationiq_key.as_deref(), Some("pk.test"));
    }

    #[test]
    fn unknown_env_mode_falls_back_to_live() {
        let config = OrchestratorConfig::from_lookup(lookup(&[(MODE_ENV, "staging"), (LOCATIONIQ_KEY_ENV, "")]));
        assert_eq!(config.mode, ToolMode::Live);
        assert!(config.locationiq_key.is_none());
    }

    #[test]
    fn sandbox_registry_has_every_tool() {
        let registry = OrchestratorConfig::default()
            .with_mode(ToolMode::Sandbox)
            .build_registry()
            .unwrap();
        assert_eq!(registry.len(), names::ALL.len());
        assert_eq!(registry.module_of(names::GET_CITY_WEATHER), Some("sandbox"));
    }

    #[test]
    fn live_registry_splits_modules() {
        let registry = OrchestratorConfig::default().build_registry().unwrap();
        assert_eq!(registry.len(), names::ALL.len());
        assert_eq!(registry.module_of(names::GET_CITY_WEATHER), Some("live"));
        assert_eq!(registry.module_of(names::SEND_EMAIL), Some("sandbox"));
    }

    #[test]
    fn resolver_uses_configured_time_parameters() {
        let resolver = OrchestratorConfig::default()
            .with_time_parameters(["deadline"])
            .build_resolver();
        assert!(resolver.is_time_parameter("Deadline"));
        assert!(!resolver.is_time_parameter("time"));
    }
}
