//! # Winch CAN Adapter Layer
//!
//! CAN 硬件抽象层，提供统一的 CAN 接口抽象。
//!
//! ## 后端
//!
//! - `socketcan`（仅 Linux）：内核 SocketCAN 接口，如 `can0`
//! - `seeed`（feature `serial`）：Seeed Studio USB-CAN 分析仪，经串口（如 `/dev/ttyUSB0`）
//! - `mock`（feature `mock` 或测试）：脚本化应答，无硬件依赖

use std::time::Duration;
use thiserror::Error;

// 重新导出 winch-protocol 中的 WinchFrame
pub use winch_protocol::WinchFrame;

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use socketcan::{SocketCanAdapter, SocketCanRxAdapter, SocketCanTxAdapter};

#[cfg(feature = "serial")]
pub mod seeed;

#[cfg(feature = "serial")]
pub use seeed::{SeeedConfig, SeeedRxAdapter, SeeedSerialAdapter, SeeedTxAdapter};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockCanAdapter;

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Buffer overflow")]
    BufferOverflow,
    #[error("Bus off")]
    BusOff,
    #[error("Device not started")]
    NotStarted,
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    UnsupportedConfig,
    InvalidResponse,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 是否为不可恢复错误（重试无意义）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CanDeviceErrorKind::NoDevice
                | CanDeviceErrorKind::AccessDenied
                | CanDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for CanDeviceError {
    fn from(message: String) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for CanDeviceError {
    fn from(message: &str) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

/// CAN 适配器
///
/// 发送为 Fire-and-Forget；接收阻塞到收到数据帧或超时（`CanError::Timeout`）。
pub trait CanAdapter {
    fn send(&mut self, frame: WinchFrame) -> Result<(), CanError>;
    fn receive(&mut self) -> Result<WinchFrame, CanError>;
    fn set_receive_timeout(&mut self, _timeout: Duration) {}
    fn receive_timeout(&mut self, timeout: Duration) -> Result<WinchFrame, CanError> {
        self.set_receive_timeout(timeout);
        self.receive()
    }
    fn try_receive(&mut self) -> Result<Option<WinchFrame>, CanError> {
        match self.receive_timeout(Duration::ZERO) {
            Ok(frame) => Ok(Some(frame)),
            Err(CanError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<A: CanAdapter + ?Sized> CanAdapter for Box<A> {
    fn send(&mut self, frame: WinchFrame) -> Result<(), CanError> {
        (**self).send(frame)
    }

    fn receive(&mut self) -> Result<WinchFrame, CanError> {
        (**self).receive()
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        (**self).set_receive_timeout(timeout)
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<WinchFrame, CanError> {
        (**self).receive_timeout(timeout)
    }
}

/// 只读半边（独立线程接收）
pub trait RxAdapter {
    fn receive(&mut self) -> Result<WinchFrame, CanError>;
}

/// 只写半边
pub trait TxAdapter {
    fn send(&mut self, frame: WinchFrame) -> Result<(), CanError>;
}

impl<T: TxAdapter + ?Sized> TxAdapter for Box<T> {
    fn send(&mut self, frame: WinchFrame) -> Result<(), CanError> {
        (**self).send(frame)
    }
}

impl<R: RxAdapter + ?Sized> RxAdapter for Box<R> {
    fn receive(&mut self) -> Result<WinchFrame, CanError> {
        (**self).receive()
    }
}

/// 可拆分为 RX/TX 两个半边的适配器
pub trait SplittableAdapter: CanAdapter {
    type RxAdapter: RxAdapter + Send + 'static;
    type TxAdapter: TxAdapter + Send + 'static;
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_device_error_is_fatal() {
        assert!(CanDeviceError::new(CanDeviceErrorKind::NotFound, "gone").is_fatal());
        assert!(CanDeviceError::new(CanDeviceErrorKind::AccessDenied, "perm").is_fatal());
        assert!(!CanDeviceError::new(CanDeviceErrorKind::Busy, "busy").is_fatal());
    }

    #[test]
    fn test_can_device_error_from_str() {
        let err: CanDeviceError = "boom".into();
        assert_eq!(err.kind, CanDeviceErrorKind::Unknown);
        assert_eq!(err.to_string(), "Unknown: boom");
    }

    #[test]
    fn test_can_error_display() {
        assert_eq!(CanError::Timeout.to_string(), "Read timeout");
        let err = CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::InvalidFrame,
            "bad tail",
        ));
        assert_eq!(err.to_string(), "Device Error: InvalidFrame: bad tail");
    }

    #[test]
    fn test_default_try_receive_maps_timeout_to_none() {
        let mut adapter = MockCanAdapter::new();
        assert!(adapter.try_receive().unwrap().is_none());

        adapter.queue_frame(WinchFrame::new_standard(0x001, &[0x91, 0, 0, 0, 0, 0, 0, 0]));
        let frame = adapter.try_receive().unwrap().unwrap();
        assert_eq!(frame.data[0], 0x91);
    }

    #[test]
    fn test_boxed_adapter_delegates() {
        let mut adapter: Box<dyn CanAdapter> = Box::new(MockCanAdapter::new());
        adapter
            .send(WinchFrame::new_standard(0x001, &[0x92, 0, 0, 0, 0, 0, 0, 0]))
            .unwrap();
        assert!(matches!(adapter.receive(), Err(CanError::Timeout)));
    }
}
