//! 命令帧编码/解码
//!
//! 每个 [`Command`] 变体对应一个固定操作码，后跟 7 字节载荷，数值字段为小端序。
//!
//! | 命令 | Byte 0 | Byte 1-7 |
//! |---|---|---|
//! | Start | 0x91 | 全 0 |
//! | Stop | 0x92 | 全 0 |
//! | Turn | 0x94 | f32 转速 (1-4) + u16 加减速 (5-6) + 00 |
//! | PositionControl | 0x95 | f32 目标位置 (1-4) + u16 时间 ms (5-6) + 00 |
//! | ReadZeroPosition | 0x84 | 14 + 全 0 |
//! | ModifyZeroPosition | 0x83 | 14 00 00 + f32 (4-7) |
//! | ReadPosition | 0xB4 | 13 + 全 0 |
//! | ReadIq | 0xB4 | 09 + 全 0 |
//! | GetFault | 0xB2 | 全 0 |

use std::time::Duration;

use crate::constants::*;
use crate::{DecodeError, Frame};

/// 绞盘电机命令
///
/// `encode` 是全函数，不会失败；`decode` 校验长度和操作码。
///
/// 含 `f32` 字段的变体只实现 `PartialEq`：NaN 载荷可以编码，但不满足
/// `decode(encode(c)) == c`。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// 启动电机 (0x91)
    Start,
    /// 停止电机 (0x92)
    Stop,
    /// 以指定转速转动 (0x94)
    Turn {
        /// 转速（RPM），符号表示方向
        rpm: f32,
        /// 加减速字段（原始值）
        ramp: u16,
    },
    /// 位置控制 (0x95)
    PositionControl {
        /// 目标位置
        target: f32,
        /// 运动时间（毫秒）
        duration_ms: u16,
    },
    /// 读取零点位置寄存器 (0x84 0x14)
    ReadZeroPosition,
    /// 修改零点位置寄存器 (0x83 0x14)
    ModifyZeroPosition(f32),
    /// 读取当前位置 (0xB4 0x13)
    ReadPosition,
    /// 读取 q 轴电流 (0xB4 0x09)
    ReadIq,
    /// 查询故障状态 (0xB2)
    GetFault,
}

impl Command {
    /// 转速指令（使用默认加减速字段）
    pub fn turn(rpm: f32) -> Self {
        Command::Turn {
            rpm,
            ramp: DEFAULT_TURN_RAMP,
        }
    }

    /// 位置控制指令
    ///
    /// 时间按毫秒截断，超出 `u16` 范围时饱和到 65535 ms。
    pub fn position_control(target: f32, duration: Duration) -> Self {
        let duration_ms = duration.as_millis().min(u128::from(u16::MAX)) as u16;
        Command::PositionControl {
            target,
            duration_ms,
        }
    }

    /// 位置控制时间（秒），其它命令返回 `None`
    pub fn duration_secs(&self) -> Option<f32> {
        match self {
            Command::PositionControl { duration_ms, .. } => Some(f32::from(*duration_ms) / 1000.0),
            _ => None,
        }
    }

    /// 操作码（Byte 0）
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Start => OP_START,
            Command::Stop => OP_STOP,
            Command::Turn { .. } => OP_TURN,
            Command::PositionControl { .. } => OP_POSITION_CONTROL,
            Command::ReadZeroPosition => OP_READ_PARAMETER,
            Command::ModifyZeroPosition(_) => OP_WRITE_PARAMETER,
            Command::ReadPosition | Command::ReadIq => OP_READ_INDICATOR,
            Command::GetFault => OP_GET_FAULT,
        }
    }

    /// 命令名称（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Turn { .. } => "turn",
            Command::PositionControl { .. } => "position-control",
            Command::ReadZeroPosition => "read-zero-position",
            Command::ModifyZeroPosition(_) => "modify-zero-position",
            Command::ReadPosition => "read-position",
            Command::ReadIq => "read-iq",
            Command::GetFault => "get-fault",
        }
    }

    /// 编码为 8 字节帧
    pub fn encode(&self) -> Frame {
        let mut data = [0u8; FRAME_LEN];
        data[0] = self.opcode();

        match *self {
            Command::Start | Command::Stop | Command::GetFault => {},
            Command::Turn { rpm, ramp } => {
                data[1..5].copy_from_slice(&rpm.to_le_bytes());
                data[5..7].copy_from_slice(&ramp.to_le_bytes());
            },
            Command::PositionControl {
                target,
                duration_ms,
            } => {
                data[1..5].copy_from_slice(&target.to_le_bytes());
                data[5..7].copy_from_slice(&duration_ms.to_le_bytes());
            },
            Command::ReadZeroPosition => {
                data[1] = PARAM_ZERO_POSITION;
            },
            Command::ModifyZeroPosition(value) => {
                data[1] = PARAM_ZERO_POSITION;
                data[VALUE_OFFSET..].copy_from_slice(&value.to_le_bytes());
            },
            Command::ReadPosition => {
                data[1] = INDICATOR_POSITION;
            },
            Command::ReadIq => {
                data[1] = INDICATOR_IQ;
            },
        }

        Frame::new(data)
    }

    /// 从原始字节解码
    ///
    /// # 错误
    /// - `DecodeError::BadLength`: 输入不是 8 字节
    /// - `DecodeError::UnknownOpcode`: Byte 0 不是已知操作码
    /// - `DecodeError::UnknownSubcode`: 已知操作码携带未知寄存器/指标编号
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::try_from(Frame::try_from(bytes)?)
    }
}

impl TryFrom<Frame> for Command {
    type Error = DecodeError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let opcode = frame.opcode();
        let subcode = frame.subcode();

        let command = match opcode {
            OP_START => Command::Start,
            OP_STOP => Command::Stop,
            OP_GET_FAULT => Command::GetFault,
            OP_TURN => Command::Turn {
                rpm: frame.f32_at(1),
                ramp: frame.u16_at(5),
            },
            OP_POSITION_CONTROL => Command::PositionControl {
                target: frame.f32_at(1),
                duration_ms: frame.u16_at(5),
            },
            OP_READ_PARAMETER => match subcode {
                PARAM_ZERO_POSITION => Command::ReadZeroPosition,
                _ => return Err(DecodeError::UnknownSubcode { opcode, subcode }),
            },
            OP_WRITE_PARAMETER => match subcode {
                PARAM_ZERO_POSITION => Command::ModifyZeroPosition(frame.f32_at(VALUE_OFFSET)),
                _ => return Err(DecodeError::UnknownSubcode { opcode, subcode }),
            },
            OP_READ_INDICATOR => match subcode {
                INDICATOR_POSITION => Command::ReadPosition,
                INDICATOR_IQ => Command::ReadIq,
                _ => return Err(DecodeError::UnknownSubcode { opcode, subcode }),
            },
            _ => return Err(DecodeError::UnknownOpcode(opcode)),
        };

        Ok(command)
    }
}

impl From<Command> for Frame {
    fn from(command: Command) -> Self {
        command.encode()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Turn { rpm, ramp } => write!(f, "turn(rpm={rpm}, ramp={ramp})"),
            Command::PositionControl {
                target,
                duration_ms,
            } => write!(f, "position-control(target={target}, duration={duration_ms}ms)"),
            Command::ModifyZeroPosition(value) => write!(f, "modify-zero-position({value})"),
            other => f.write_str(other.name()),
        }
    }
}
