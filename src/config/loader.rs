use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 环境变量前缀，嵌套字段以 `__` 分隔，例如 `DINACHARYA_SCHEDULER__TICK_INTERVAL_SECS`
pub const ENV_PREFIX: &str = "DINACHARYA_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 优先级（后者覆盖前者）：
    /// 1. 内置开发配置
    /// 2. ./config.toml
    /// 3. 环境变量
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        let scheduler = &config.scheduler;
        if scheduler.tick_interval_secs == 0 || scheduler.tick_interval_secs > 60 {
            return Err(ConfigValidationError::InvalidTickInterval(
                scheduler.tick_interval_secs,
            ));
        }

        if scheduler.delivery_timeout_ms == 0
            || scheduler.delivery_timeout() >= scheduler.tick_interval()
        {
            return Err(ConfigValidationError::InvalidDeliveryTimeout(
                scheduler.delivery_timeout_ms,
            ));
        }

        if config.seed.owner_id.trim().is_empty() {
            return Err(ConfigValidationError::MissingSeedOwner);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigValidationError {
    #[error("评估周期无效: {0} 秒，必须在 1 到 60 之间")]
    InvalidTickInterval(u64),

    #[error("投递超时无效: {0} 毫秒，必须大于 0 且小于评估周期")]
    InvalidDeliveryTimeout(u64),

    #[error("初始化用户 ID 未配置")]
    MissingSeedOwner,
}

impl From<ConfigValidationError> for crate::error::AppError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::AppError::Config(err.to_string())
    }
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}
