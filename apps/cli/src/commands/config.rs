//! 配置管理命令
//!
//! 配置文件默认位于 `<config_dir>/winch/config.toml`，可用 `--config` 或
//! 环境变量 `WINCH_CONFIG` 指定其它路径。

use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("winch");
    path.push("config.toml");
    Ok(path)
}

/// 解析配置文件路径（命令行/环境变量优先）
pub fn config_file(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_file(),
    }
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// 默认 SocketCAN 接口（如 can0）
    pub interface: Option<String>,

    /// 默认 USB-CAN 串口设备（如 /dev/ttyUSB0）
    pub device: Option<String>,

    /// CAN 总线速率（串口分析仪）
    pub bitrate: Option<u32>,

    /// 串口波特率
    pub baudrate: Option<u32>,

    /// 电机 ID
    pub motor_id: Option<u16>,

    /// 应答超时（毫秒）
    pub response_timeout_ms: Option<u64>,
}

impl CliConfig {
    /// 加载配置（文件不存在时返回默认配置）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    /// 保存配置
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("创建配置目录失败")?;
        }

        let body = toml::to_string_pretty(self).context("序列化配置失败")?;
        let content = format!("# Winch CLI Configuration\n\n{body}");
        fs::write(path, content).context("写入配置文件失败")?;
        Ok(())
    }
}

fn show<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "(未设置)".to_string(),
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// SocketCAN 接口名称（如 can0）
        #[arg(short, long)]
        interface: Option<String>,

        /// USB-CAN 串口设备（如 /dev/ttyUSB0）
        #[arg(short, long)]
        device: Option<String>,

        /// CAN 总线速率（bps）
        #[arg(long)]
        bitrate: Option<u32>,

        /// 串口波特率
        #[arg(long)]
        baudrate: Option<u32>,

        /// 电机 ID
        #[arg(long)]
        motor_id: Option<u16>,

        /// 应答超时（毫秒）
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（interface / device / bitrate / baudrate / motor-id / timeout-ms / all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub async fn execute(self, explicit_path: Option<&Path>) -> Result<()> {
        let path = config_file(explicit_path)?;
        match self {
            ConfigCommand::Set {
                interface,
                device,
                bitrate,
                baudrate,
                motor_id,
                timeout_ms,
            } => {
                let mut config = CliConfig::load(&path)?;

                if let Some(iface) = interface {
                    println!("✅ 设置默认接口: {}", iface);
                    config.interface = Some(iface);
                }
                if let Some(dev) = device {
                    println!("✅ 设置默认串口设备: {}", dev);
                    config.device = Some(dev);
                }
                if let Some(rate) = bitrate {
                    println!("✅ 设置 CAN 速率: {} bps", rate);
                    config.bitrate = Some(rate);
                }
                if let Some(baud) = baudrate {
                    println!("✅ 设置串口波特率: {}", baud);
                    config.baudrate = Some(baud);
                }
                if let Some(id) = motor_id {
                    println!("✅ 设置电机 ID: {}", id);
                    config.motor_id = Some(id);
                }
                if let Some(ms) = timeout_ms {
                    println!("✅ 设置应答超时: {} ms", ms);
                    config.response_timeout_ms = Some(ms);
                }

                config.save(&path)
            },

            ConfigCommand::Get { key } => {
                let config = CliConfig::load(&path)?;
                match key.as_str() {
                    "interface" => println!("{}", show(&config.interface)),
                    "device" => println!("{}", show(&config.device)),
                    "bitrate" => println!("{}", show(&config.bitrate)),
                    "baudrate" => println!("{}", show(&config.baudrate)),
                    "motor-id" => println!("{}", show(&config.motor_id)),
                    "timeout-ms" => println!("{}", show(&config.response_timeout_ms)),
                    "all" => print_config(&config),
                    other => anyhow::bail!("未知配置项: {}", other),
                }
                Ok(())
            },

            ConfigCommand::Check => {
                let config = CliConfig::load(&path)?;
                println!("配置文件: {}", path.display());
                if !path.exists() {
                    println!("  (文件不存在，使用默认配置)");
                }
                print_config(&config);
                if config.interface.is_some() && config.device.is_some() {
                    println!("⚠️  同时设置了 interface 和 device，将优先使用 SocketCAN 接口");
                }
                Ok(())
            },
        }
    }
}

fn print_config(config: &CliConfig) {
    println!("Winch CLI 配置:");
    println!("  接口: {}", show(&config.interface));
    println!("  串口设备: {}", show(&config.device));
    println!("  CAN 速率: {}", show(&config.bitrate));
    println!("  串口波特率: {}", show(&config.baudrate));
    println!("  电机 ID: {}", show(&config.motor_id));
    println!("  应答超时 (ms): {}", show(&config.response_timeout_ms));
}
