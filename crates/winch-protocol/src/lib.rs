//! # Winch Protocol
//!
//! 绞盘电机控制器 CAN 协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 操作码、子码等协议常量
//! - `frame`: 8 字节协议帧 [`Frame`] 和 CAN 帧封装 [`WinchFrame`]
//! - `command`: 命令编码/解码 [`Command`]
//! - `reply`: 应答解析 [`Reply`]
//! - `hex`: 十六进制文本输入输出
//!
//! ## 字节序
//!
//! 数值字段（f32 / u16 / u32）均为 Intel (LSB) 低位在前（小端字节序）。

pub mod command;
pub mod constants;
pub mod frame;
pub mod hex;
pub mod reply;

// 重新导出常用类型
pub use command::Command;
pub use constants::*;
pub use frame::{Frame, WinchFrame};
pub use hex::{HexError, format_hex, parse_hex_bytes, parse_hex_frame};
pub use reply::{FaultStatus, Reply};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid frame length: expected 8, got {actual}")]
    BadLength { actual: usize },

    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("Unknown subcode 0x{subcode:02X} for opcode 0x{opcode:02X}")]
    UnknownSubcode { opcode: u8, subcode: u8 },
}
