//! 连接参数与适配器创建
//!
//! 命令行参数优先于配置文件；`--interface` 选择 SocketCAN，`--device` 选择
//! Seeed USB-CAN 串口分析仪。两者都未给出时使用配置文件，仍未设置则默认
//! `/dev/ttyUSB0`。

use crate::commands::config::CliConfig;
use anyhow::{Context, Result};
use clap::Args;
use std::time::Duration;
use winch_can::{CanAdapter, RxAdapter, SeeedConfig, SeeedSerialAdapter, SplittableAdapter, TxAdapter};
use winch_driver::{Winch, WinchConfig};

pub type BoxedAdapter = Box<dyn CanAdapter + Send>;
pub type BoxedRx = Box<dyn RxAdapter + Send>;
pub type BoxedTx = Box<dyn TxAdapter + Send>;

/// 连接参数（覆盖配置文件）
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// SocketCAN 接口（如 can0）
    #[arg(short, long, conflicts_with = "device")]
    pub interface: Option<String>,

    /// USB-CAN 串口设备（如 /dev/ttyUSB0）
    #[arg(short, long)]
    pub device: Option<String>,

    /// CAN 总线速率（bps，仅串口分析仪）
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// 串口波特率
    #[arg(long)]
    pub baudrate: Option<u32>,

    /// 电机 ID
    #[arg(long)]
    pub motor_id: Option<u16>,

    /// 应答帧 CAN ID（十六进制，如 0x001；默认接受任意 ID）
    #[arg(long, value_parser = parse_can_id)]
    pub response_id: Option<u32>,

    /// 应答超时（毫秒）
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

fn parse_can_id(text: &str) -> Result<u32, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid CAN id '{text}': {e}"))
}

/// 传输后端
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    SocketCan { interface: String },
    Seeed(SeeedConfig),
}

/// 解析后的连接配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub transport: Transport,
    pub winch: WinchConfig,
}

impl ConnectArgs {
    /// 合并命令行参数和配置文件
    pub fn resolve(&self, config: &CliConfig) -> Connection {
        let seeed = |device: &str| {
            let defaults = SeeedConfig::default();
            Transport::Seeed(SeeedConfig {
                device: device.to_string(),
                baudrate: self.baudrate.or(config.baudrate).unwrap_or(defaults.baudrate),
                bitrate: self.bitrate.or(config.bitrate).unwrap_or(defaults.bitrate),
                ..defaults
            })
        };

        let transport = match (&self.interface, &self.device) {
            (Some(interface), _) => Transport::SocketCan {
                interface: interface.clone(),
            },
            (None, Some(device)) => seeed(device),
            (None, None) => match (&config.interface, &config.device) {
                (Some(interface), _) => Transport::SocketCan {
                    interface: interface.clone(),
                },
                (None, Some(device)) => seeed(device),
                (None, None) => seeed(&SeeedConfig::default().device),
            },
        };

        let defaults = WinchConfig::default();
        let winch = WinchConfig {
            motor_id: self.motor_id.or(config.motor_id).unwrap_or(defaults.motor_id),
            response_id: self.response_id,
            response_timeout: self
                .timeout_ms
                .or(config.response_timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.response_timeout),
        };

        Connection { transport, winch }
    }
}

impl Connection {
    /// 人类可读的描述
    pub fn describe(&self) -> String {
        match &self.transport {
            Transport::SocketCan { interface } => format!("SocketCAN {interface}"),
            Transport::Seeed(cfg) => format!(
                "USB-CAN {} ({} baud, CAN {} bps)",
                cfg.device, cfg.baudrate, cfg.bitrate
            ),
        }
    }

    /// 打开适配器
    pub fn open(&self) -> Result<BoxedAdapter> {
        match &self.transport {
            Transport::SocketCan { interface } => open_socketcan(interface),
            Transport::Seeed(cfg) => {
                let adapter = SeeedSerialAdapter::open(cfg.clone())
                    .with_context(|| format!("打开串口设备失败: {}", cfg.device))?;
                Ok(Box::new(adapter))
            },
        }
    }

    /// 打开适配器并创建客户端
    pub fn open_winch(&self) -> Result<Winch<BoxedAdapter>> {
        Ok(Winch::with_config(self.open()?, self.winch))
    }

    /// 打开适配器并分离 RX/TX（交互式 Shell 使用）
    pub fn open_split(&self) -> Result<(BoxedRx, BoxedTx)> {
        match &self.transport {
            Transport::SocketCan { interface } => split_socketcan(interface),
            Transport::Seeed(cfg) => {
                let adapter = SeeedSerialAdapter::open(cfg.clone())
                    .with_context(|| format!("打开串口设备失败: {}", cfg.device))?;
                let (rx, tx) = adapter.split().context("分离串口适配器失败")?;
                Ok((Box::new(rx), Box::new(tx)))
            },
        }
    }
}

#[cfg(target_os = "linux")]
fn open_socketcan(interface: &str) -> Result<BoxedAdapter> {
    let adapter = winch_can::SocketCanAdapter::new(interface)
        .with_context(|| format!("打开 CAN 接口失败: {interface}"))?;
    Ok(Box::new(adapter))
}

#[cfg(target_os = "linux")]
fn split_socketcan(interface: &str) -> Result<(BoxedRx, BoxedTx)> {
    let adapter = winch_can::SocketCanAdapter::new(interface)
        .with_context(|| format!("打开 CAN 接口失败: {interface}"))?;
    let (rx, tx) = adapter.split().context("分离 SocketCAN 适配器失败")?;
    Ok((Box::new(rx), Box::new(tx)))
}

#[cfg(not(target_os = "linux"))]
fn open_socketcan(interface: &str) -> Result<BoxedAdapter> {
    anyhow::bail!("SocketCAN ({interface}) 仅支持 Linux，请使用 --device 指定串口分析仪")
}

#[cfg(not(target_os = "linux"))]
fn split_socketcan(interface: &str) -> Result<(BoxedRx, BoxedTx)> {
    anyhow::bail!("SocketCAN ({interface}) 仅支持 Linux，请使用 --device 指定串口分析仪")
}
