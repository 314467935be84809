//! SocketCAN 适配器分离实现
//!
//! 提供独立的 RX 和 TX 适配器，支持双线程并发访问。
//! 通过复制文件描述符（`as_fd().try_clone_to_owned()`，即 `dup()`）实现。
//!
//! # ⚠️ 共享状态
//!
//! 克隆出的 FD 共享同一个"打开文件描述"：严禁在分离后的适配器上调用
//! `set_nonblocking()`，超时只通过 `SO_RCVTIMEO` 实现。

use super::{read_data_frame, to_socketcan_frame};
use crate::{CanError, RxAdapter, TxAdapter, WinchFrame};
use socketcan::{CanSocket, Socket};
use std::os::fd::AsFd;
use std::time::Duration;
use tracing::trace;

/// 复制 socket 的文件描述符
fn duplicate(socket: &CanSocket) -> std::io::Result<CanSocket> {
    socket.as_fd().try_clone_to_owned().map(CanSocket::from)
}

/// 只读适配器（用于 RX 线程）
#[derive(Debug)]
pub struct SocketCanRxAdapter {
    socket: CanSocket,
}

impl SocketCanRxAdapter {
    /// 克隆 socket 并设置读超时
    ///
    /// # 错误
    /// - `CanError::Io`: 克隆 socket 或设置超时失败
    pub fn new(socket: &CanSocket, read_timeout: Duration) -> Result<Self, CanError> {
        let rx_socket = duplicate(socket).map_err(|e| {
            CanError::Io(std::io::Error::other(format!(
                "Failed to clone SocketCAN socket for RX: {e}"
            )))
        })?;
        rx_socket
            .set_read_timeout(read_timeout.max(Duration::from_millis(1)))
            .map_err(CanError::Io)?;
        Ok(Self { socket: rx_socket })
    }
}

impl RxAdapter for SocketCanRxAdapter {
    fn receive(&mut self) -> Result<WinchFrame, CanError> {
        read_data_frame(&self.socket)
    }
}

/// 只写适配器（用于 TX 线程）
#[derive(Debug)]
pub struct SocketCanTxAdapter {
    socket: CanSocket,
}

impl SocketCanTxAdapter {
    /// 克隆 socket
    ///
    /// # 错误
    /// - `CanError::Io`: 克隆 socket 失败
    pub fn new(socket: &CanSocket) -> Result<Self, CanError> {
        let tx_socket = duplicate(socket).map_err(|e| {
            CanError::Io(std::io::Error::other(format!(
                "Failed to clone SocketCAN socket for TX: {e}"
            )))
        })?;
        Ok(Self { socket: tx_socket })
    }
}

impl TxAdapter for SocketCanTxAdapter {
    fn send(&mut self, frame: WinchFrame) -> Result<(), CanError> {
        let can_frame = to_socketcan_frame(&frame)?;
        self.socket.write_frame(&can_frame).map_err(CanError::Io)?;
        trace!("TX adapter sent frame: ID=0x{:X}, len={}", frame.id, frame.len);
        Ok(())
    }
}
