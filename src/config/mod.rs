//! 面板配置模块

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "kernel-panel.toml";

/// 面板启动配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Web 管理界面端口
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// 数据库路径
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// JWT 密钥 (可选，默认从环境变量 JWT_SECRET 读取)
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// JWT 过期时间（小时）
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_hours: i64,

    /// 前端静态文件目录
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// 首次启动时创建的管理员用户名
    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    /// 日志目录，设置后按天滚动写入文件
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_web_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "./data/kernel-panel.db".to_string()
}

fn default_jwt_expiration() -> i64 {
    24
}

fn default_static_dir() -> String {
    "dist".to_string()
}

fn default_admin_username() -> String {
    "admin".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_port: default_web_port(),
            db_path: default_db_path(),
            jwt_secret: None,
            jwt_expiration_hours: default_jwt_expiration(),
            static_dir: default_static_dir(),
            admin_username: default_admin_username(),
            log_dir: None,
        }
    }
}

impl Config {
    /// 读取配置，同时返回实际使用的配置文件路径
    ///
    /// 显式指定的路径必须存在；否则依次查找工作目录和可执行文件所在目录，
    /// 都没有时使用默认配置。
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(dir.join(CONFIG_FILE_NAME));
        }

        for path in candidates {
            if path.exists() {
                return Ok((Self::from_file(&path)?, Some(path)));
            }
        }

        Ok((Self::default(), None))
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    /// 数据目录：数据库文件所在目录
    pub fn data_dir(&self) -> PathBuf {
        match Path::new(&self.db_path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("./data"),
        }
    }

    /// 获取 JWT 密钥（优先从环境变量读取，其次从配置文件，最后自动生成）
    pub fn get_jwt_secret(&self) -> anyhow::Result<String> {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                return Ok(secret);
            }
        }

        if let Some(ref secret) = self.jwt_secret {
            if !secret.is_empty() {
                return Ok(secret.clone());
            }
        }

        self.get_or_generate_jwt_secret()
    }

    /// 从文件获取或生成新的 JWT 密钥
    fn get_or_generate_jwt_secret(&self) -> anyhow::Result<String> {
        let data_dir = self.data_dir();
        let secret_file = data_dir.join("jwt_secret.key");

        if secret_file.exists() {
            let secret = fs::read_to_string(&secret_file)
                .with_context(|| format!("无法读取 JWT 密钥文件: {}", secret_file.display()))?;
            let secret = secret.trim();
            if !secret.is_empty() {
                return Ok(secret.to_string());
            }
        }

        let secret = generate_random_secret(64);

        if let Err(e) = fs::create_dir_all(&data_dir) {
            tracing::warn!("无法创建 data 目录: {}", e);
        } else if let Err(e) = fs::write(&secret_file, &secret) {
            tracing::warn!("无法保存 JWT 密钥到文件: {}", e);
        } else {
            tracing::info!("🔑 已生成并保存新的 JWT 密钥到: {}", secret_file.display());
        }

        Ok(secret)
    }
}

/// 生成随机密钥
fn generate_random_secret(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
