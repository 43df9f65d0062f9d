//! Configuration loading and typed config structures for the vending
//! benchmark.
//!
//! The canonical configuration lives in `vendbench-config.yaml` at the
//! project root. Every field has a default, so an empty file (or no file)
//! is a valid configuration. Language-model connection settings can be
//! overridden from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use vendbench_agents::ToolLimits;
use vendbench_runner::{LlmBackendConfig, Provider};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of range or inconsistent with another.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `vendbench-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Run-level settings (money, pacing, length, seed).
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Operating limits enforced by the tools.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Decision agent settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Meltdown detection and human-help settings.
    #[serde(default)]
    pub safety: SafetyConfig,

    /// Language-model backend settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file, apply environment overrides,
    /// and validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment
    /// overrides, and validate.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.llm.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let safety = &self.safety;
        if safety.meltdown_repeat_threshold == 0 {
            return Err(invalid("safety.meltdown_repeat_threshold must be at least 1"));
        }
        if safety.meltdown_repeat_threshold > safety.meltdown_window {
            return Err(invalid(format!(
                "safety.meltdown_repeat_threshold ({}) exceeds safety.meltdown_window ({})",
                safety.meltdown_repeat_threshold, safety.meltdown_window
            )));
        }
        if safety.human_help_timeout_enabled && safety.human_help_timeout_secs == 0 {
            return Err(invalid("safety.human_help_timeout_secs must be positive when the timeout is enabled"));
        }

        let limits = &self.limits;
        if limits.min_item_price.is_sign_negative() {
            return Err(invalid("limits.min_item_price must not be negative"));
        }
        if limits.min_item_price > limits.max_item_price {
            return Err(invalid(format!(
                "limits.min_item_price ({}) exceeds limits.max_item_price ({})",
                limits.min_item_price, limits.max_item_price
            )));
        }
        if limits.max_machine_capacity == 0 {
            return Err(invalid("limits.max_machine_capacity must be positive"));
        }

        if self.agent.max_context_tokens == 0 {
            return Err(invalid("agent.max_context_tokens must be positive"));
        }
        if self.simulation.daily_fee.is_sign_negative() {
            return Err(invalid("simulation.daily_fee must not be negative"));
        }
        self.llm.provider()?;
        Ok(())
    }
}

/// Run-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Cash balance at the start of a run.
    #[serde(default = "default_initial_cash_balance")]
    pub initial_cash_balance: Decimal,

    /// Operating fee deducted at each day close.
    #[serde(default = "default_daily_fee")]
    pub daily_fee: Decimal,

    /// Pause between turns, in milliseconds.
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u64,

    /// Turns to play before the run finishes.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Seed for all simulation randomness; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Pause between turns.
    pub const fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_cash_balance: default_initial_cash_balance(),
            daily_fee: default_daily_fee(),
            turn_delay_ms: default_turn_delay_ms(),
            max_turns: default_max_turns(),
            seed: None,
        }
    }
}

/// Operating limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    /// Maximum units across all items in the vending machine.
    #[serde(default = "default_max_machine_capacity")]
    pub max_machine_capacity: u32,

    /// Lowest allowed item price.
    #[serde(default = "default_min_item_price")]
    pub min_item_price: Decimal,

    /// Highest allowed item price.
    #[serde(default = "default_max_item_price")]
    pub max_item_price: Decimal,

    /// Largest quantity on one order or restock line.
    #[serde(default = "default_max_order_quantity")]
    pub max_order_quantity: u32,
}

impl LimitsConfig {
    /// The limits as the tool catalog consumes them.
    pub const fn tool_limits(&self) -> ToolLimits {
        ToolLimits {
            max_machine_capacity: self.max_machine_capacity,
            min_item_price: self.min_item_price,
            max_item_price: self.max_item_price,
            max_order_quantity: self.max_order_quantity,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_machine_capacity: default_max_machine_capacity(),
            min_item_price: default_min_item_price(),
            max_item_price: default_max_item_price(),
            max_order_quantity: default_max_order_quantity(),
        }
    }
}

/// Decision agent settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    /// Token budget for the rolling turn history.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Persona rendered into every decision prompt.
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Directory whose `*.j2` files override the built-in prompt templates.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: default_max_context_tokens(),
            persona: default_persona(),
            templates_dir: None,
        }
    }
}

/// Meltdown detection and human-help settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SafetyConfig {
    /// Number of recent actions the watchdog remembers.
    #[serde(default = "default_meltdown_window")]
    pub meltdown_window: usize,

    /// Identical trailing actions that count as a meltdown.
    #[serde(default = "default_meltdown_repeat_threshold")]
    pub meltdown_repeat_threshold: usize,

    /// Whether the agent may ask for human help.
    #[serde(default = "default_true")]
    pub human_help_enabled: bool,

    /// Whether an unanswered help request eventually resumes on its own.
    #[serde(default)]
    pub human_help_timeout_enabled: bool,

    /// Seconds to wait for an operator before resuming.
    #[serde(default = "default_human_help_timeout_secs")]
    pub human_help_timeout_secs: u64,
}

impl SafetyConfig {
    /// The human-help deadline, when enabled.
    pub const fn human_help_timeout(&self) -> Option<Duration> {
        if self.human_help_timeout_enabled {
            Some(Duration::from_secs(self.human_help_timeout_secs))
        } else {
            None
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            meltdown_window: default_meltdown_window(),
            meltdown_repeat_threshold: default_meltdown_repeat_threshold(),
            human_help_enabled: true,
            human_help_timeout_enabled: false,
            human_help_timeout_secs: default_human_help_timeout_secs(),
        }
    }
}

/// Language-model backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmConfig {
    /// Provider name: `openai`, `anthropic`, `gemini`, `ollama`, or `scripted`.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier; the provider default when absent.
    #[serde(default)]
    pub model: Option<String>,

    /// Base API URL; the provider default when absent.
    #[serde(default)]
    pub api_url: Option<String>,

    /// API key for hosted providers.
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Canned responses for the `scripted` provider, in order.
    #[serde(default)]
    pub scripted_responses: Vec<String>,
}

impl LlmConfig {
    /// Override connection settings with environment variables when set:
    /// `LLM_PROVIDER`, `LLM_MODEL`, `LLM_API_URL`, `LLM_API_KEY`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LLM_PROVIDER") {
            self.provider = val;
        }
        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.model = Some(val);
        }
        if let Ok(val) = std::env::var("LLM_API_URL") {
            self.api_url = Some(val);
        }
        if let Ok(val) = std::env::var("LLM_API_KEY") {
            self.api_key = val;
        }
    }

    /// The configured provider.
    pub fn provider(&self) -> Result<Provider, ConfigError> {
        self.provider.parse().map_err(|e| invalid(format!("llm.provider: {e}")))
    }

    /// Connection settings for the backend factory.
    pub fn backend_config(&self) -> Result<LlmBackendConfig, ConfigError> {
        let mut backend = LlmBackendConfig::for_provider(self.provider()?);
        if let Some(model) = self.model.as_ref().filter(|m| !m.trim().is_empty()) {
            backend.model.clone_from(model);
        }
        if let Some(url) = self.api_url.as_ref().filter(|u| !u.trim().is_empty()) {
            backend.api_url.clone_from(url);
        }
        backend.api_key.clone_from(&self.api_key);
        backend.request_timeout = Duration::from_millis(self.request_timeout_ms);
        backend.scripted_responses.clone_from(&self.scripted_responses);
        Ok(backend)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_url: None,
            api_key: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            scripted_responses: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_initial_cash_balance() -> Decimal {
    Decimal::from_parts(500, 0, 0, false, 0)
}

const fn default_daily_fee() -> Decimal {
    Decimal::from_parts(2, 0, 0, false, 0)
}

const fn default_turn_delay_ms() -> u64 {
    1000
}

const fn default_max_turns() -> u32 {
    100
}

const fn default_max_machine_capacity() -> u32 {
    200
}

const fn default_min_item_price() -> Decimal {
    Decimal::from_parts(1, 0, 0, false, 2)
}

const fn default_max_item_price() -> Decimal {
    Decimal::from_parts(50, 0, 0, false, 0)
}

const fn default_max_order_quantity() -> u32 {
    10_000
}

const fn default_max_context_tokens() -> usize {
    30_000
}

fn default_persona() -> String {
    "A meticulous and profit-oriented business manager focused on long-term growth.".to_owned()
}

const fn default_meltdown_window() -> usize {
    10
}

const fn default_meltdown_repeat_threshold() -> usize {
    3
}

const fn default_human_help_timeout_secs() -> u64 {
    300
}

fn default_provider() -> String {
    "openai".to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn parsed(yaml: &str) -> EngineConfig {
        serde_yml::from_str(yaml).unwrap_or_else(|e| panic!("yaml should parse: {e}"))
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.simulation.initial_cash_balance, dec!(500));
        assert_eq!(config.simulation.daily_fee, dec!(2));
        assert_eq!(config.simulation.turn_delay(), Duration::from_secs(1));
        assert_eq!(config.simulation.max_turns, 100);
        assert_eq!(config.limits.min_item_price, dec!(0.01));
        assert_eq!(config.limits.max_item_price, dec!(50));
        assert_eq!(config.agent.max_context_tokens, 30_000);
        assert_eq!(config.safety.meltdown_window, 10);
        assert_eq!(config.safety.meltdown_repeat_threshold, 3);
        assert!(config.safety.human_help_enabled);
        assert_eq!(config.safety.human_help_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = parsed(
            "simulation:\n  initial_cash_balance: 250.50\n  seed: 7\nsafety:\n  human_help_timeout_enabled: true\n  human_help_timeout_secs: 30\n",
        );
        assert_eq!(config.simulation.initial_cash_balance, dec!(250.50));
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.max_turns, 100);
        assert_eq!(config.safety.human_help_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn threshold_above_window_is_rejected() {
        let config = parsed("safety:\n  meltdown_window: 2\n  meltdown_repeat_threshold: 3\n");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let config = parsed("limits:\n  min_item_price: 10\n  max_item_price: 5\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_context_budget_is_rejected() {
        let config = parsed("agent:\n  max_context_tokens: 0\n");
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_daily_fee_is_rejected_but_negative_cash_is_not() {
        assert!(parsed("simulation:\n  daily_fee: -1\n").validate().is_err());
        assert!(parsed("simulation:\n  initial_cash_balance: -10\n").validate().is_ok());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(parsed("llm:\n  provider: watson\n").validate().is_err());
    }

    #[test]
    fn backend_config_overrides_provider_defaults() {
        let config = parsed(
            "llm:\n  provider: ollama\n  model: llama3\n  request_timeout_ms: 5000\n",
        );
        let Ok(backend) = config.llm.backend_config() else {
            panic!("backend config should build");
        };
        assert_eq!(backend.provider, Provider::Ollama);
        assert_eq!(backend.model, "llama3");
        assert_eq!(backend.api_url, Provider::Ollama.default_api_url());
        assert_eq!(backend.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("vendbench-config.yaml");
        if path.exists() {
            let config = std::fs::read_to_string(&path)
                .map_err(ConfigError::from)
                .and_then(|yaml| serde_yml::from_str::<EngineConfig>(&yaml).map_err(ConfigError::from));
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
