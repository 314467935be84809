//! 协议常量定义
//!
//! 操作码（Byte 0）、寄存器/指标子码（Byte 1）以及默认 CAN ID。

// ============================================================================
// 操作码（Byte 0）
// ============================================================================

/// 启动电机
pub const OP_START: u8 = 0x91;
/// 停止电机
pub const OP_STOP: u8 = 0x92;
/// 速度模式：以指定转速转动
pub const OP_TURN: u8 = 0x94;
/// 位置控制
pub const OP_POSITION_CONTROL: u8 = 0x95;
/// 修改参数寄存器
pub const OP_WRITE_PARAMETER: u8 = 0x83;
/// 读取参数寄存器
pub const OP_READ_PARAMETER: u8 = 0x84;
/// 查询故障状态
pub const OP_GET_FAULT: u8 = 0xB2;
/// 读取运行指标
pub const OP_READ_INDICATOR: u8 = 0xB4;

// ============================================================================
// 子码（Byte 1）
// ============================================================================

/// 零点位置参数寄存器
pub const PARAM_ZERO_POSITION: u8 = 0x14;

/// 运行指标：q 轴电流（Iq）
pub const INDICATOR_IQ: u8 = 0x09;
/// 运行指标：当前位置
pub const INDICATOR_POSITION: u8 = 0x13;

// ============================================================================
// 帧常量
// ============================================================================

/// 命令/应答帧固定长度
pub const FRAME_LEN: usize = 8;

/// 默认电机 ID（标准帧仲裁 ID）
pub const DEFAULT_MOTOR_ID: u16 = 1;

/// 标准帧 ID 掩码（11-bit）
pub const CAN_SFF_MASK: u32 = 0x0000_07FF;
/// 扩展帧 ID 掩码（29-bit）
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

/// 数值字段（f32/u32）在应答帧中的起始偏移
pub const VALUE_OFFSET: usize = 4;

/// 转速指令默认加减速字段（0x07D0）
pub const DEFAULT_TURN_RAMP: u16 = 2000;

/// 位置保持指令默认时间字段（0x1432，来自现场抓包）
pub const DEFAULT_HOLD_DURATION: u16 = 0x1432;
