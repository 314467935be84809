//! SocketCAN CAN 适配器实现
//!
//! Linux 平台下的 SocketCAN 支持，使用内核级的 CAN 通讯接口。
//!
//! ## 特性
//!
//! - 支持标准帧和扩展帧
//! - 自动过滤错误帧（Bus Off / 缓冲区溢出上报为错误，其余忽略）
//! - 使用 `SO_RCVTIMEO` 实现读超时
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**：SocketCAN 是 Linux 内核特性
//! - **接口配置**：波特率由系统工具配置，不在应用层设置：
//!   `sudo ip link set can0 type can bitrate 500000 && sudo ip link set up can0`

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, SplittableAdapter, WinchFrame};
use socketcan::{
    CanError as SocketCanError, CanErrorFrame, CanFrame, CanSocket, EmbeddedFrame, ExtendedId,
    Frame, Socket, StandardId,
};
use std::time::Duration;
use tracing::{error, trace, warn};

pub mod split;

pub use split::{SocketCanRxAdapter, SocketCanTxAdapter};

/// 默认读超时
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// SocketCAN 适配器
///
/// # 示例
///
/// ```no_run
/// use winch_can::{CanAdapter, SocketCanAdapter, WinchFrame};
///
/// let mut adapter = SocketCanAdapter::new("can0").unwrap();
/// adapter
///     .send(WinchFrame::new_standard(0x001, &[0x91, 0, 0, 0, 0, 0, 0, 0]))
///     .unwrap();
/// let reply = adapter.receive().unwrap();
/// ```
#[derive(Debug)]
pub struct SocketCanAdapter {
    /// SocketCAN socket
    socket: CanSocket,
    /// 接口名称（如 "can0"）
    interface: String,
    /// 读超时时间（用于 receive 方法）
    read_timeout: Duration,
}

impl SocketCanAdapter {
    /// 打开 SocketCAN 接口
    ///
    /// # 错误
    /// - `CanError::Device`: 接口不存在或无法打开（会提示 `ip link` 命令）
    /// - `CanError::Io`: 设置读超时失败
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        let interface = interface.into();

        let socket = CanSocket::open(&interface).map_err(|e| {
            CanError::Device(CanDeviceError::new(
                match e.kind() {
                    std::io::ErrorKind::NotFound => CanDeviceErrorKind::NotFound,
                    std::io::ErrorKind::PermissionDenied => CanDeviceErrorKind::AccessDenied,
                    _ => CanDeviceErrorKind::Backend,
                },
                format!(
                    "Failed to open CAN interface '{interface}': {e}. Is it up?\n  sudo ip link set up {interface}"
                ),
            ))
        })?;

        socket
            .set_read_timeout(DEFAULT_READ_TIMEOUT)
            .map_err(CanError::Io)?;

        trace!("SocketCAN interface '{}' opened", interface);

        Ok(Self {
            socket,
            interface,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// 获取接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 获取读超时时间
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// 设置读超时
    ///
    /// `SO_RCVTIMEO` 为 0 表示无限阻塞，因此超时至少取 1ms。
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), CanError> {
        let timeout = timeout.max(Duration::from_millis(1));
        self.socket.set_read_timeout(timeout).map_err(CanError::Io)?;
        self.read_timeout = timeout;
        Ok(())
    }
}

/// WinchFrame -> socketcan::CanFrame
pub(crate) fn to_socketcan_frame(frame: &WinchFrame) -> Result<CanFrame, CanError> {
    let data = frame.data_slice();
    let can_frame = if frame.is_extended {
        ExtendedId::new(frame.id).and_then(|id| CanFrame::new(id, data))
    } else {
        u16::try_from(frame.id)
            .ok()
            .and_then(StandardId::new)
            .and_then(|id| CanFrame::new(id, data))
    };

    can_frame.ok_or_else(|| {
        CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::InvalidFrame,
            format!("Failed to create CAN frame with ID 0x{:X}", frame.id),
        ))
    })
}

/// socketcan::CanFrame -> WinchFrame
pub(crate) fn from_socketcan_frame(can_frame: &CanFrame) -> WinchFrame {
    let mut frame = if can_frame.is_extended() {
        WinchFrame::new_extended(can_frame.raw_id(), can_frame.data())
    } else {
        WinchFrame::new_standard(can_frame.raw_id() as u16, can_frame.data())
    };
    frame.timestamp_us = now_us();
    frame
}

/// 软件接收时间戳（微秒，Unix 纪元）
fn now_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// 读取一个数据帧（过滤错误帧）
pub(crate) fn read_data_frame(socket: &CanSocket) -> Result<WinchFrame, CanError> {
    loop {
        let can_frame = match socket.read_frame() {
            Ok(frame) => frame,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                return Err(CanError::Timeout);
            },
            Err(e) => return Err(CanError::Io(e)),
        };

        if !can_frame.is_error_frame() {
            let frame = from_socketcan_frame(&can_frame);
            trace!("Received CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
            return Ok(frame);
        }

        match CanErrorFrame::try_from(can_frame) {
            Ok(error_frame) => match SocketCanError::from(error_frame) {
                SocketCanError::BusOff => {
                    error!("CAN Bus Off error detected");
                    return Err(CanError::BusOff);
                },
                SocketCanError::ControllerProblem(problem)
                    if problem.to_string().to_lowercase().contains("overflow") =>
                {
                    error!("CAN Buffer Overflow detected: {}", problem);
                    return Err(CanError::BufferOverflow);
                },
                other => {
                    warn!("CAN Error Frame received: {}, ignoring", other);
                },
            },
            Err(_) => warn!("Received CAN error frame but failed to parse, ignoring"),
        }
    }
}

impl CanAdapter for SocketCanAdapter {
    /// 发送帧（Fire-and-Forget）
    fn send(&mut self, frame: WinchFrame) -> Result<(), CanError> {
        let can_frame = to_socketcan_frame(&frame)?;
        self.socket.write_frame(&can_frame).map_err(CanError::Io)?;
        trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
        Ok(())
    }

    /// 接收帧（阻塞直到收到有效数据帧或超时）
    fn receive(&mut self) -> Result<WinchFrame, CanError> {
        read_data_frame(&self.socket)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.set_read_timeout(timeout) {
            warn!("Failed to set receive timeout: {}", e);
        }
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<WinchFrame, CanError> {
        let old_timeout = self.read_timeout;
        self.set_read_timeout(timeout)?;
        let result = self.receive();
        if let Err(e) = self.set_read_timeout(old_timeout) {
            warn!("Failed to restore receive timeout: {}", e);
        }
        result
    }
}

impl SplittableAdapter for SocketCanAdapter {
    type RxAdapter = SocketCanRxAdapter;
    type TxAdapter = SocketCanTxAdapter;

    /// 分离为独立的 RX 和 TX 适配器（复制文件描述符，共享同一打开文件描述）
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        let rx = SocketCanRxAdapter::new(&self.socket, self.read_timeout)?;
        let tx = SocketCanTxAdapter::new(&self.socket)?;
        trace!(
            "SocketCanAdapter split into RX and TX adapters (interface: {})",
            self.interface
        );
        Ok((rx, tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_socketcan_frame_standard() {
        let frame = WinchFrame::new_standard(0x001, &[0x91, 0, 0, 0, 0, 0, 0, 0]);
        let can_frame = to_socketcan_frame(&frame).unwrap();
        assert_eq!(can_frame.raw_id(), 0x001);
        assert!(!can_frame.is_extended());
        assert_eq!(can_frame.data(), frame.data_slice());
    }

    #[test]
    fn test_to_socketcan_frame_extended() {
        let frame = WinchFrame::new_extended(0x1234_5678, &[1, 2, 3]);
        let can_frame = to_socketcan_frame(&frame).unwrap();
        assert!(can_frame.is_extended());
        assert_eq!(can_frame.raw_id(), 0x1234_5678);
    }

    #[test]
    fn test_from_socketcan_frame() {
        let id = StandardId::new(0x002).unwrap();
        let can_frame = CanFrame::new(id, &[0xB4, 0x13, 0, 0, 0, 0, 0x80, 0x3F]).unwrap();
        let frame = from_socketcan_frame(&can_frame);
        assert_eq!(frame.id, 0x002);
        assert_eq!(frame.len, 8);
        assert!(frame.timestamp_us > 0);
    }

    #[test]
    fn test_open_missing_interface_fails() {
        let result = SocketCanAdapter::new("nonexistent99");
        assert!(matches!(result, Err(CanError::Device(_))));
    }

    /// 需要 vcan0：
    /// `sudo modprobe vcan && sudo ip link add dev vcan0 type vcan && sudo ip link set up vcan0`
    #[test]
    #[ignore]
    fn test_split_on_vcan0_round_trip() {
        use crate::{RxAdapter, TxAdapter};

        let adapter = SocketCanAdapter::new("vcan0").unwrap();
        let (mut rx, mut tx) = adapter.split().unwrap();

        // 同一 socket 不会收到自己发送的帧，另开一个监听
        let mut observer = SocketCanAdapter::new("vcan0").unwrap();
        let frame = WinchFrame::new_standard(0x001, &[0x92, 0, 0, 0, 0, 0, 0, 0]);
        tx.send(frame).unwrap();
        let seen = observer.receive().unwrap();
        assert_eq!(seen.data_slice(), frame.data_slice());

        observer.send(WinchFrame::new_standard(0x002, &[0x91, 0, 0, 0, 0, 0, 0, 0])).unwrap();
        let received = rx.receive().unwrap();
        assert_eq!(received.id, 0x002);
        assert_eq!(received.data[0], 0x91);
    }
}
