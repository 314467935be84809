//! Seeed Studio USB-CAN 分析仪适配器
//!
//! 通过串口（如 `/dev/ttyUSB0`）访问 CAN 总线，适用于没有 SocketCAN 驱动的
//! USB-CAN 分析仪。打开时发送设置包（总线速率、过滤、工作模式），之后收发数据包。
//!
//! ## 限制
//!
//! - 分析仪不回传错误帧，总线错误只能表现为应答超时
//! - 无硬件时间戳，接收时间戳由主机生成

pub mod protocol;

use crate::{
    CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, RxAdapter, SplittableAdapter,
    TxAdapter, WinchFrame,
};
use protocol::{OperationMode, PacketDecoder, Settings};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// 串口适配器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeeedConfig {
    /// 串口设备路径
    pub device: String,
    /// 串口波特率
    pub baudrate: u32,
    /// CAN 总线速率
    pub bitrate: u32,
    /// 是否使用扩展帧
    pub extended: bool,
    /// 工作模式
    pub mode: OperationMode,
    /// 默认读超时
    pub read_timeout: Duration,
}

impl Default for SeeedConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baudrate: protocol::DEFAULT_SERIAL_BAUDRATE,
            bitrate: 500_000,
            extended: false,
            mode: OperationMode::Normal,
            read_timeout: Duration::from_millis(100),
        }
    }
}

impl SeeedConfig {
    fn settings(&self) -> Settings {
        Settings {
            bitrate: self.bitrate,
            extended: self.extended,
            mode: self.mode,
            ..Settings::default()
        }
    }
}

/// Seeed USB-CAN 串口适配器
pub struct SeeedSerialAdapter {
    port: Box<dyn SerialPort>,
    decoder: PacketDecoder,
    config: SeeedConfig,
    read_timeout: Duration,
}

impl std::fmt::Debug for SeeedSerialAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeeedSerialAdapter")
            .field("config", &self.config)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

fn map_serial_error(device: &str, e: serialport::Error) -> CanError {
    let kind = match e.kind() {
        serialport::ErrorKind::NoDevice => CanDeviceErrorKind::NoDevice,
        serialport::ErrorKind::InvalidInput => CanDeviceErrorKind::UnsupportedConfig,
        serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => CanDeviceErrorKind::NotFound,
        serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
            CanDeviceErrorKind::AccessDenied
        },
        _ => CanDeviceErrorKind::Backend,
    };
    CanError::Device(CanDeviceError::new(
        kind,
        format!("Serial port '{device}': {e}"),
    ))
}

impl SeeedSerialAdapter {
    /// 打开串口并发送设置包
    ///
    /// # 错误
    /// - `CanError::Device`: 串口不存在/无权限，或总线速率不受支持
    /// - `CanError::Io`: 写设置包失败
    pub fn open(config: SeeedConfig) -> Result<Self, CanError> {
        let settings = config.settings().pack()?;

        let mut port = serialport::new(&config.device, config.baudrate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| map_serial_error(&config.device, e))?;

        port.write_all(&settings)?;
        port.flush()?;

        debug!(
            "Seeed USB-CAN adapter opened on '{}' ({} baud, CAN {} bps)",
            config.device, config.baudrate, config.bitrate
        );

        Ok(Self {
            port,
            decoder: PacketDecoder::new(),
            read_timeout: config.read_timeout,
            config,
        })
    }

    /// 当前配置
    pub fn config(&self) -> &SeeedConfig {
        &self.config
    }
}

/// 从串口读取直到解码出一帧或超时
///
/// 所有接收路径（`receive` / `receive_timeout` / RX 半边）共用，丢弃的字节在此告警。
fn read_frame(
    port: &mut dyn SerialPort,
    decoder: &mut PacketDecoder,
    timeout: Duration,
    device: &str,
) -> Result<WinchFrame, CanError> {
    let dropped = decoder.dropped_bytes();
    let result = read_frame_inner(port, decoder, timeout, device);
    report_dropped(decoder, dropped, device);
    result
}

/// 自 `before` 以来丢弃的字节数（有则告警）
fn report_dropped(decoder: &PacketDecoder, before: u64, device: &str) -> u64 {
    let discarded = decoder.dropped_bytes().saturating_sub(before);
    if discarded > 0 {
        warn!("Discarded {} unparseable bytes from '{}'", discarded, device);
    }
    discarded
}

fn read_frame_inner(
    port: &mut dyn SerialPort,
    decoder: &mut PacketDecoder,
    timeout: Duration,
    device: &str,
) -> Result<WinchFrame, CanError> {
    if let Some(frame) = decoder.next_frame() {
        return Ok(stamp(frame));
    }

    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; 64];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        port.set_timeout(remaining.max(Duration::from_millis(1)))
            .map_err(|e| map_serial_error(device, e))?;

        match port.read(&mut buf) {
            Ok(0) => {},
            Ok(n) => {
                decoder.push(&buf[..n]);
                if let Some(frame) = decoder.next_frame() {
                    let frame = stamp(frame);
                    trace!("Received CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
                    return Ok(frame);
                }
            },
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                ) => {},
            Err(e) => return Err(CanError::Io(e)),
        }

        if Instant::now() >= deadline {
            return Err(CanError::Timeout);
        }
    }
}

fn stamp(mut frame: WinchFrame) -> WinchFrame {
    frame.timestamp_us = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);
    frame
}

fn write_frame(port: &mut dyn SerialPort, frame: &WinchFrame) -> Result<(), CanError> {
    let packet = protocol::encode_frame(frame);
    port.write_all(&packet)?;
    trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
    Ok(())
}

impl CanAdapter for SeeedSerialAdapter {
    fn send(&mut self, frame: WinchFrame) -> Result<(), CanError> {
        write_frame(self.port.as_mut(), &frame)
    }

    fn receive(&mut self) -> Result<WinchFrame, CanError> {
        read_frame(
            self.port.as_mut(),
            &mut self.decoder,
            self.read_timeout,
            &self.config.device,
        )
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<WinchFrame, CanError> {
        read_frame(self.port.as_mut(), &mut self.decoder, timeout, &self.config.device)
    }
}

/// 只读半边
pub struct SeeedRxAdapter {
    port: Box<dyn SerialPort>,
    decoder: PacketDecoder,
    read_timeout: Duration,
    device: String,
}

impl RxAdapter for SeeedRxAdapter {
    fn receive(&mut self) -> Result<WinchFrame, CanError> {
        read_frame(self.port.as_mut(), &mut self.decoder, self.read_timeout, &self.device)
    }
}

/// 只写半边
pub struct SeeedTxAdapter {
    port: Box<dyn SerialPort>,
}

impl TxAdapter for SeeedTxAdapter {
    fn send(&mut self, frame: WinchFrame) -> Result<(), CanError> {
        write_frame(self.port.as_mut(), &frame)
    }
}

impl SplittableAdapter for SeeedSerialAdapter {
    type RxAdapter = SeeedRxAdapter;
    type TxAdapter = SeeedTxAdapter;

    /// 分离为 RX/TX（基于 `try_clone()`，RX 半边继承已缓存的未解析字节）
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        let tx_port = self
            .port
            .try_clone()
            .map_err(|e| map_serial_error(&self.config.device, e))?;
        Ok((
            SeeedRxAdapter {
                port: self.port,
                decoder: self.decoder,
                read_timeout: self.read_timeout,
                device: self.config.device,
            },
            SeeedTxAdapter { port: tx_port },
        ))
    }
}
