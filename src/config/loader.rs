use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 环境变量前缀，嵌套字段以 `__` 分隔，例如 `CVISB_DROPBOX__TOKEN`
pub const ENV_PREFIX: &str = "CVISB_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序：
    /// 1. 内置默认值
    /// 2. ./cvisb.toml
    /// 3. 环境变量
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 验证配置
    ///
    /// `offline` 为 true 时（dry-run）不要求访问令牌。
    pub fn validate(config: &AppConfig, offline: bool) -> Result<(), ConfigValidationError> {
        if !offline && config.dropbox.token.trim().is_empty() {
            return Err(ConfigValidationError::MissingToken);
        }

        if config.dropbox.api_url.is_empty() || config.dropbox.content_url.is_empty() {
            return Err(ConfigValidationError::MissingApiUrl);
        }

        if !config.dropbox.root_folder.starts_with('/') {
            return Err(ConfigValidationError::InvalidPath(
                config.dropbox.root_folder.clone(),
            ));
        }

        if config.generator.patients == 0 {
            return Err(ConfigValidationError::InvalidPatientCount);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("Dropbox 访问令牌未配置 (设置 CVISB_DROPBOX__TOKEN)")]
    MissingToken,

    #[error("Dropbox API 地址未配置")]
    MissingApiUrl,

    #[error("患者数量无效，必须大于 0")]
    InvalidPatientCount,

    #[error("根目录必须以 / 开头: {0}")]
    InvalidPath(String),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("cvisb.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [dropbox]
                token = "from-file"
                root_folder = "/Proto"

                [generator]
                patients = 10
                "#,
            )?;
            jail.set_env("CVISB_GENERATOR__PATIENTS", "12");

            let config = ConfigLoader::load_from("custom.toml")?;
            assert_eq!(config.dropbox.token, "from-file");
            assert_eq!(config.dropbox.root_folder, "/Proto");
            assert_eq!(config.generator.patients, 12);
            // untouched sections keep defaults
            assert_eq!(config.generator.expt_file, "expt_list.csv");
            assert!(config.upload.overwrite);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load()?;
            assert_eq!(config.generator.patients, 25);
            assert!(config.dropbox.token.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        assert!(matches!(
            ConfigLoader::validate(&config, false),
            Err(ConfigValidationError::MissingToken)
        ));
        assert!(ConfigLoader::validate(&config, true).is_ok());

        config.dropbox.token = "t".into();
        assert!(ConfigLoader::validate(&config, false).is_ok());

        config.generator.patients = 0;
        assert!(matches!(
            ConfigLoader::validate(&config, false),
            Err(ConfigValidationError::InvalidPatientCount)
        ));

        config.generator.patients = 3;
        config.dropbox.root_folder = "CViSB".into();
        assert!(matches!(
            ConfigLoader::validate(&config, false),
            Err(ConfigValidationError::InvalidPath(_))
        ));
    }
}
