//! 应答帧解析
//!
//! 控制器的应答回显请求的前 2 个字节（操作码 + 子码）。数值应答在
//! Byte 4-7 携带小端序 f32；故障应答在 Byte 4-7 携带 u32 故障位图。
//! `B4` 的其它指标编号（如压力测试默认的 `B4 12`）解码为 `Reply::Indicator`。

use crate::constants::*;
use crate::{DecodeError, Frame};

/// 故障状态位图（0 表示无故障）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaultStatus(pub u32);

impl FaultStatus {
    /// 是否无故障
    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }

    /// 原始位图
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// 已置位的故障位编号（从 0 开始）
    pub fn active_bits(&self) -> impl Iterator<Item = u32> + '_ {
        (0..u32::BITS).filter(move |bit| self.0 & (1 << bit) != 0)
    }
}

impl std::fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_ok() {
            f.write_str("no fault")
        } else {
            write!(f, "fault bits 0x{:08X}", self.0)
        }
    }
}

/// 解码后的控制器应答
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reply {
    /// 无数值的确认应答（回显操作码）
    Ack(u8),
    /// 当前位置
    Position(f32),
    /// q 轴电流（A）
    Iq(f32),
    /// 零点位置寄存器的值
    ZeroPosition(f32),
    /// 故障状态
    Fault(FaultStatus),
    /// 其它指标（`B4 <index>`），数值为 Byte 4-7 的 f32
    Indicator { index: u8, value: f32 },
}

impl Reply {
    /// 从原始字节解码
    ///
    /// # 错误
    /// - `DecodeError::BadLength`: 输入不是 8 字节
    /// - `DecodeError::UnknownOpcode`: Byte 0 不是已知操作码
    /// - `DecodeError::UnknownSubcode`: 参数读写（`83`/`84`）携带未知寄存器编号
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::try_from(Frame::try_from(bytes)?)
    }

    /// 数值（确认应答和故障应答返回 `None`）
    pub fn value(&self) -> Option<f32> {
        match *self {
            Reply::Position(v) | Reply::Iq(v) | Reply::ZeroPosition(v) => Some(v),
            Reply::Indicator { value, .. } => Some(value),
            Reply::Ack(_) | Reply::Fault(_) => None,
        }
    }
}

impl TryFrom<Frame> for Reply {
    type Error = DecodeError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let opcode = frame.opcode();
        let subcode = frame.subcode();

        let reply = match opcode {
            OP_START | OP_STOP | OP_TURN | OP_POSITION_CONTROL => Reply::Ack(opcode),
            OP_WRITE_PARAMETER => match subcode {
                PARAM_ZERO_POSITION => Reply::Ack(opcode),
                _ => return Err(DecodeError::UnknownSubcode { opcode, subcode }),
            },
            OP_READ_PARAMETER => match subcode {
                PARAM_ZERO_POSITION => Reply::ZeroPosition(frame.f32_at(VALUE_OFFSET)),
                _ => return Err(DecodeError::UnknownSubcode { opcode, subcode }),
            },
            OP_READ_INDICATOR => match subcode {
                INDICATOR_POSITION => Reply::Position(frame.f32_at(VALUE_OFFSET)),
                INDICATOR_IQ => Reply::Iq(frame.f32_at(VALUE_OFFSET)),
                index => Reply::Indicator {
                    index,
                    value: frame.f32_at(VALUE_OFFSET),
                },
            },
            OP_GET_FAULT => Reply::Fault(FaultStatus(frame.u32_at(VALUE_OFFSET))),
            _ => return Err(DecodeError::UnknownOpcode(opcode)),
        };

        Ok(reply)
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Ack(opcode) => write!(f, "ack(0x{opcode:02X})"),
            Reply::Position(v) => write!(f, "position={v}"),
            Reply::Iq(v) => write!(f, "iq={v}A"),
            Reply::ZeroPosition(v) => write!(f, "zero-position={v}"),
            Reply::Fault(status) => write!(f, "{status}"),
            Reply::Indicator { index, value } => write!(f, "indicator 0x{index:02X}={value}"),
        }
    }
}
