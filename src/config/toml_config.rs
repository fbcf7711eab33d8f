use crate::core::backoff::JitterBackoff;
use crate::core::coordinator::{SerializationMode, TransactionCoordinator};
use crate::core::executor::{self, DomainExecutor};
use crate::core::interceptor::{self, TransactionalInterceptor};
use crate::core::registry::{DomainLockRegistry, LockHandle};
use crate::utils::error::{Result, TxnError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub domain_executor: DomainExecutorConfig,
    #[serde(default)]
    pub global_interceptor: GlobalInterceptorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub serialization: SerializationMode,
}

/// `[domain_executor]` 區段；未設定的欄位使用預設值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainExecutorConfig {
    #[serde(default = "default_domain_backoff_min_ms")]
    pub backoff_min_ms: u64,
    #[serde(default = "default_domain_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// 0 停用期限
    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: Option<u64>,
}

/// `[global_interceptor]` 區段；全域鎖沒有期限設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalInterceptorConfig {
    #[serde(default = "default_global_backoff_min_ms")]
    pub backoff_min_ms: u64,
    #[serde(default = "default_global_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_domain_backoff_min_ms() -> u64 {
    executor::DEFAULT_BACKOFF_MIN.as_millis() as u64
}

fn default_domain_backoff_max_ms() -> u64 {
    executor::DEFAULT_BACKOFF_MAX.as_millis() as u64
}

fn default_deadline_seconds() -> Option<u64> {
    Some(executor::DEFAULT_DEADLINE.as_secs())
}

fn default_global_backoff_min_ms() -> u64 {
    interceptor::DEFAULT_BACKOFF_MIN.as_millis() as u64
}

fn default_global_backoff_max_ms() -> u64 {
    interceptor::DEFAULT_BACKOFF_MAX.as_millis() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: LogFormat::Compact,
        }
    }
}

impl Default for DomainExecutorConfig {
    fn default() -> Self {
        Self {
            backoff_min_ms: default_domain_backoff_min_ms(),
            backoff_max_ms: default_domain_backoff_max_ms(),
            deadline_seconds: default_deadline_seconds(),
        }
    }
}

impl DomainExecutorConfig {
    pub fn backoff(&self) -> JitterBackoff {
        JitterBackoff::from_millis(self.backoff_min_ms, self.backoff_max_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        match self.deadline_seconds {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for GlobalInterceptorConfig {
    fn default() -> Self {
        Self {
            backoff_min_ms: default_global_backoff_min_ms(),
            backoff_max_ms: default_global_backoff_max_ms(),
        }
    }
}

impl GlobalInterceptorConfig {
    pub fn backoff(&self) -> JitterBackoff {
        JitterBackoff::from_millis(self.backoff_min_ms, self.backoff_max_ms)
    }
}

fn validate_backoff_window(section: &str, min_ms: u64, max_ms: u64) -> Result<()> {
    validation::validate_range(&format!("{}.backoff_min_ms", section), min_ms, 0, 60_000)?;
    validation::validate_range(&format!("{}.backoff_max_ms", section), max_ms, 0, 60_000)?;
    if max_ms < min_ms {
        return Err(TxnError::InvalidConfigValueError {
            field: format!("{}.backoff_max_ms", section),
            value: max_ms.to_string(),
            reason: format!("must not be below backoff_min_ms ({})", min_ms),
        });
    }
    Ok(())
}

impl GuardConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TxnError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TXN_GUARD_MODE})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| TxnError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn build_executor(&self, registry: Arc<DomainLockRegistry>) -> DomainExecutor {
        DomainExecutor::new(registry)
            .with_backoff(Arc::new(self.domain_executor.backoff()))
            .with_deadline(self.domain_executor.deadline())
    }

    pub fn build_interceptor(&self, lock: LockHandle) -> TransactionalInterceptor {
        TransactionalInterceptor::new(lock).with_backoff(Arc::new(self.global_interceptor.backoff()))
    }

    /// Builds the full lock set once; call at startup.
    pub fn build_coordinator(&self) -> TransactionCoordinator {
        let registry = Arc::new(DomainLockRegistry::new());
        TransactionCoordinator::new(
            self.coordinator.serialization,
            self.build_executor(registry),
            self.build_interceptor(LockHandle::new("global")),
        )
    }
}

impl Validate for GuardConfig {
    fn validate(&self) -> Result<()> {
        validate_backoff_window(
            "domain_executor",
            self.domain_executor.backoff_min_ms,
            self.domain_executor.backoff_max_ms,
        )?;
        validate_backoff_window(
            "global_interceptor",
            self.global_interceptor.backoff_min_ms,
            self.global_interceptor.backoff_max_ms,
        )?;

        if let Some(level) = &self.logging.level {
            validation::validate_non_empty_string("logging.level", level)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GuardConfig::from_toml_str("").unwrap();

        assert_eq!(config.coordinator.serialization, SerializationMode::PerDomain);
        assert_eq!(config.domain_executor.backoff_min_ms, 200);
        assert_eq!(config.domain_executor.backoff_max_ms, 500);
        assert_eq!(config.domain_executor.deadline(), Some(Duration::from_secs(60)));
        assert_eq!(config.global_interceptor.backoff_min_ms, 100);
        assert_eq!(config.global_interceptor.backoff_max_ms, 300);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[coordinator]
serialization = "layered"

[domain_executor]
backoff_min_ms = 10
backoff_max_ms = 20
deadline_seconds = 0

[global_interceptor]
backoff_min_ms = 5
backoff_max_ms = 5

[logging]
level = "txn_guard=trace"
format = "json"
"#;

        let config = GuardConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.coordinator.serialization, SerializationMode::Layered);
        assert_eq!(config.domain_executor.deadline(), None);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
        assert_eq!(config.build_coordinator().mode(), SerializationMode::Layered);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TXN_GUARD_TEST_MODE", "global");

        let toml_content = r#"
[coordinator]
serialization = "${TXN_GUARD_TEST_MODE}"
"#;

        let config = GuardConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.coordinator.serialization, SerializationMode::Global);

        std::env::remove_var("TXN_GUARD_TEST_MODE");
    }

    #[test]
    fn test_inverted_backoff_window_is_rejected() {
        let toml_content = r#"
[domain_executor]
backoff_min_ms = 500
backoff_max_ms = 200
"#;

        let config = GuardConfig::from_toml_str(toml_content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("domain_executor.backoff_max_ms"));
    }

    #[test]
    fn test_partial_section_keeps_remaining_defaults() {
        let config = GuardConfig::from_toml_str(
            "[domain_executor]\nbackoff_min_ms = 10\n\n[global_interceptor]\nbackoff_max_ms = 150\n",
        )
        .unwrap();

        assert_eq!(config.domain_executor.backoff_min_ms, 10);
        assert_eq!(config.domain_executor.backoff_max_ms, 500);
        assert_eq!(config.domain_executor.deadline(), Some(Duration::from_secs(60)));
        assert_eq!(config.global_interceptor.backoff_min_ms, 100);
        assert_eq!(config.global_interceptor.backoff_max_ms, 150);
        assert_eq!(
            config.domain_executor.backoff().bounds(),
            (Duration::from_millis(10), Duration::from_millis(500))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deadline_rejected_in_global_section() {
        let result =
            GuardConfig::from_toml_str("[global_interceptor]\ndeadline_seconds = 5\n");
        let err = result.unwrap_err();
        assert!(matches!(err, TxnError::ConfigValidationError { .. }));
        assert!(err.to_string().contains("deadline_seconds"));
    }

    #[test]
    fn test_unknown_mode_fails_to_parse() {
        let result = GuardConfig::from_toml_str("[coordinator]\nserialization = \"sharded\"\n");
        assert!(matches!(result, Err(TxnError::ConfigValidationError { .. })));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[coordinator]\nserialization = \"global\"\n")
            .unwrap();

        let config = GuardConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.coordinator.serialization, SerializationMode::Global);
    }
}
