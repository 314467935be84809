//! Seeed Studio USB-CAN 分析仪串口协议
//!
//! 分析仪通过 USB 虚拟串口（CH340）与主机通讯，串口波特率固定 2 Mbps。
//!
//! ## 设置包（20 字节）
//!
//! ```text
//! AA 55 12 <speed> <frame type> <filter id ×4> <mask id ×4> <mode> 01 00 00 00 00 <checksum>
//! ```
//!
//! 校验和为 Byte 2..=18 之和的低 8 位。
//!
//! ## 数据包
//!
//! ```text
//! AA <info> <id LE ×2|×4> <data ×dlc> 55
//! info = 0xC0 | (extended ? 0x20 : 0) | (remote ? 0x10 : 0) | dlc
//! ```

use crate::{CanDeviceError, CanDeviceErrorKind, CanError, WinchFrame};

/// 包起始字节
pub const PACKET_HEAD: u8 = 0xAA;
/// 数据包结束字节
pub const PACKET_TAIL: u8 = 0x55;
/// 设置包标识（紧随 0xAA 0x55）
pub const SETTINGS_MARKER: [u8; 2] = [0x55, 0x12];
/// 设置包长度
pub const SETTINGS_LEN: usize = 20;

/// info 字节：数据包类型标记
pub const INFO_DATA_PACKET: u8 = 0xC0;
/// info 字节：扩展帧
pub const INFO_EXTENDED: u8 = 0x20;
/// info 字节：远程帧
pub const INFO_REMOTE: u8 = 0x10;
/// info 字节：DLC 掩码
pub const INFO_DLC_MASK: u8 = 0x0F;

/// 分析仪默认串口波特率
pub const DEFAULT_SERIAL_BAUDRATE: u32 = 2_000_000;

/// CAN 总线速率编码
pub fn speed_code(bitrate: u32) -> Option<u8> {
    let code = match bitrate {
        1_000_000 => 0x01,
        800_000 => 0x02,
        500_000 => 0x03,
        400_000 => 0x04,
        250_000 => 0x05,
        200_000 => 0x06,
        125_000 => 0x07,
        100_000 => 0x08,
        50_000 => 0x09,
        20_000 => 0x0A,
        10_000 => 0x0B,
        5_000 => 0x0C,
        _ => return None,
    };
    Some(code)
}

/// 分析仪工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationMode {
    #[default]
    Normal = 0x00,
    Loopback = 0x01,
    Silent = 0x02,
    LoopbackAndSilent = 0x03,
}

/// 设置包参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// CAN 总线速率（bps）
    pub bitrate: u32,
    /// 是否使用扩展帧
    pub extended: bool,
    /// 接收过滤 ID
    pub filter_id: u32,
    /// 接收过滤掩码（0 表示接收全部）
    pub mask_id: u32,
    /// 工作模式
    pub mode: OperationMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bitrate: 500_000,
            extended: false,
            filter_id: 0,
            mask_id: 0,
            mode: OperationMode::Normal,
        }
    }
}

impl Settings {
    /// 打包为 20 字节设置包
    ///
    /// # 错误
    /// - `CanError::Device(UnsupportedConfig)`: 不支持的总线速率
    pub fn pack(&self) -> Result<[u8; SETTINGS_LEN], CanError> {
        let speed = speed_code(self.bitrate).ok_or_else(|| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::UnsupportedConfig,
                format!("Unsupported CAN bitrate: {}", self.bitrate),
            ))
        })?;

        let mut packet = [0u8; SETTINGS_LEN];
        packet[0] = PACKET_HEAD;
        packet[1..3].copy_from_slice(&SETTINGS_MARKER);
        packet[3] = speed;
        packet[4] = if self.extended { 0x02 } else { 0x01 };
        packet[5..9].copy_from_slice(&self.filter_id.to_le_bytes());
        packet[9..13].copy_from_slice(&self.mask_id.to_le_bytes());
        packet[13] = self.mode as u8;
        packet[14] = 0x01;
        // Byte 15-18: 自定义波特率参数，保留为 0
        packet[19] = checksum(&packet[2..19]);
        Ok(packet)
    }
}

/// 字节和的低 8 位
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// 将 CAN 帧编码为数据包
pub fn encode_frame(frame: &WinchFrame) -> Vec<u8> {
    let data = frame.data_slice();
    let mut info = INFO_DATA_PACKET | (data.len() as u8 & INFO_DLC_MASK);
    if frame.is_extended {
        info |= INFO_EXTENDED;
    }

    let mut packet = Vec::with_capacity(2 + 4 + data.len() + 1);
    packet.push(PACKET_HEAD);
    packet.push(info);
    if frame.is_extended {
        packet.extend_from_slice(&frame.id.to_le_bytes());
    } else {
        packet.extend_from_slice(&(frame.id as u16).to_le_bytes());
    }
    packet.extend_from_slice(data);
    packet.push(PACKET_TAIL);
    packet
}

/// 数据包流解码器
///
/// 串口是字节流，一次 `read` 可能包含半个包或多个包。解码器缓存字节，
/// 每次 `next_frame` 返回一个完整帧；遇到非法字节时丢弃并重新同步到下一个 0xAA。
#[derive(Debug, Default)]
pub struct PacketDecoder {
    buffer: Vec<u8>,
    dropped: u64,
}

/// 单包解析结果
enum Parse {
    /// 解析成功，消耗的字节数
    Frame(WinchFrame, usize),
    /// 数据不足，等待更多字节
    Incomplete,
    /// 非法包头，丢弃 1 字节
    Invalid,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加从串口读到的字节
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// 因重同步而丢弃的字节数
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped
    }

    /// 缓存中尚未解析的字节数
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// 取出下一个完整帧
    pub fn next_frame(&mut self) -> Option<WinchFrame> {
        loop {
            // 跳到下一个包头
            match self.buffer.iter().position(|&b| b == PACKET_HEAD) {
                Some(0) => {},
                Some(skip) => {
                    self.discard(skip);
                },
                None => {
                    let len = self.buffer.len();
                    self.discard(len);
                    return None;
                },
            }

            match Self::parse(&self.buffer) {
                Parse::Frame(frame, consumed) => {
                    self.buffer.drain(..consumed);
                    return Some(frame);
                },
                Parse::Incomplete => return None,
                Parse::Invalid => self.discard(1),
            }
        }
    }

    fn discard(&mut self, count: usize) {
        self.buffer.drain(..count);
        self.dropped += count as u64;
    }

    fn parse(buf: &[u8]) -> Parse {
        let Some(&info) = buf.get(1) else {
            return Parse::Incomplete;
        };
        if info & INFO_DATA_PACKET != INFO_DATA_PACKET {
            return Parse::Invalid;
        }

        let dlc = usize::from(info & INFO_DLC_MASK);
        if dlc > 8 {
            return Parse::Invalid;
        }
        let extended = info & INFO_EXTENDED != 0;
        let id_len = if extended { 4 } else { 2 };
        let total = 2 + id_len + dlc + 1;
        if buf.len() < total {
            return Parse::Incomplete;
        }
        if buf[total - 1] != PACKET_TAIL {
            return Parse::Invalid;
        }

        let id_bytes = &buf[2..2 + id_len];
        let data = &buf[2 + id_len..2 + id_len + dlc];
        let frame = if extended {
            let mut id = [0u8; 4];
            id.copy_from_slice(id_bytes);
            WinchFrame::new_extended(u32::from_le_bytes(id), data)
        } else {
            WinchFrame::new_standard(u16::from_le_bytes([id_bytes[0], id_bytes[1]]), data)
        };
        Parse::Frame(frame, total)
    }
}
