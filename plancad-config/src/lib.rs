use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "PLANCAD_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.editor.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `PLANCAD_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 编辑器与网格构建参数。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 拾取容差（世界单位）。
    pub pick_tolerance: f64,
    pub default_extrude_height: f64,
    /// 整圆离散段数。
    pub curve_segments: usize,
    pub fillet_segments: usize,
    pub loft_samples: usize,
    pub loft_spacing: f64,
    pub placeholder_size: f64,
    /// 撤销栈最大深度。
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            pick_tolerance: 2.0,
            default_extrude_height: 100.0,
            curve_segments: 32,
            fillet_segments: 4,
            loft_samples: 100,
            loft_spacing: 100.0,
            placeholder_size: 10.0,
            history_limit: 100,
        }
    }
}

impl EditorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("pick_tolerance", self.pick_tolerance),
            ("default_extrude_height", self.default_extrude_height),
            ("placeholder_size", self.placeholder_size),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("必须为正数，实际为 {value}"),
                });
            }
        }
        if self.curve_segments < 3 {
            return Err(ConfigError::Invalid {
                field: "curve_segments",
                message: format!("至少为 3，实际为 {}", self.curve_segments),
            });
        }
        if self.loft_samples < 3 {
            return Err(ConfigError::Invalid {
                field: "loft_samples",
                message: format!("至少为 3，实际为 {}", self.loft_samples),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项 `editor.{field}` 无效: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
