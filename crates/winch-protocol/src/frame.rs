//! 帧定义
//!
//! - [`Frame`]：固定 8 字节的命令/应答单元（协议层看到的数据）
//! - [`WinchFrame`]：CAN 2.0 帧封装（ID + 数据 + 时间戳），适配层收发的单位

use crate::DecodeError;
use crate::constants::{CAN_EFF_MASK, CAN_SFF_MASK, FRAME_LEN};

/// 固定 8 字节的命令/应答帧
///
/// 不变量：长度恒为 8。从切片构造时使用 `TryFrom<&[u8]>`，长度不符返回
/// [`DecodeError::BadLength`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// 从 8 字节数组创建
    pub const fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// 操作码（Byte 0）
    pub fn opcode(&self) -> u8 {
        self.0[0]
    }

    /// 子码（Byte 1，寄存器或指标编号）
    pub fn subcode(&self) -> u8 {
        self.0[1]
    }

    /// 应答匹配键：控制器的应答回显请求的前 2 个字节
    pub fn correlation_key(&self) -> [u8; 2] {
        [self.0[0], self.0[1]]
    }

    /// 判断 `self`（应答）是否对应 `request`
    pub fn answers(&self, request: &Frame) -> bool {
        self.correlation_key() == request.correlation_key()
    }

    /// 以小端序读取 Byte `offset..offset+4` 处的 f32
    ///
    /// # Panics
    ///
    /// `offset + 4 > 8` 时 panic。偏移量是协议布局中的常量，不来自总线数据。
    pub fn f32_at(&self, offset: usize) -> f32 {
        f32::from_le_bytes(self.word_at(offset))
    }

    /// 以小端序读取 Byte `offset..offset+4` 处的 u32
    ///
    /// # Panics
    ///
    /// `offset + 4 > 8` 时 panic。偏移量是协议布局中的常量，不来自总线数据。
    pub fn u32_at(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.word_at(offset))
    }

    /// 以小端序读取 Byte `offset..offset+2` 处的 u16
    ///
    /// # Panics
    ///
    /// `offset + 2 > 8` 时 panic。偏移量是协议布局中的常量，不来自总线数据。
    pub fn u16_at(&self, offset: usize) -> u16 {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(&self.0[offset..offset + 2]);
        u16::from_le_bytes(buf)
    }

    fn word_at(&self, offset: usize) -> [u8; 4] {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.0[offset..offset + 4]);
        buf
    }

    /// 获取字节数组
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// 消费并返回字节数组
    pub fn into_bytes(self) -> [u8; FRAME_LEN] {
        self.0
    }
}

impl From<[u8; FRAME_LEN]> for Frame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Frame {
    type Error = DecodeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; FRAME_LEN] = bytes
            .try_into()
            .map_err(|_| DecodeError::BadLength { actual: bytes.len() })?;
        Ok(Self(array))
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::hex::format_hex(&self.0))
    }
}

/// CAN 2.0 标准帧的统一抽象
///
/// 协议层和硬件层之间的中间类型：协议层只关心 8 字节 [`Frame`]，
/// 适配层（SocketCAN / Seeed 串口）只收发 `WinchFrame`。
///
/// ```text
/// Command ──encode──▶ Frame ──to_can_frame──▶ WinchFrame ──▶ CanAdapter
/// Reply   ◀─decode─── Frame ◀──payload()──── WinchFrame ◀── CanAdapter
/// ```
///
/// # 示例
///
/// ```rust
/// use winch_protocol::WinchFrame;
///
/// let frame = WinchFrame::new_standard(0x001, &[0x91, 0, 0, 0, 0, 0, 0, 0]);
/// assert_eq!(frame.id(), 0x001);
/// assert_eq!(frame.data_slice()[0], 0x91);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WinchFrame {
    /// CAN ID（标准帧或扩展帧）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; FRAME_LEN],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 是否为扩展帧（29-bit ID）
    pub is_extended: bool,

    /// 接收时间戳（微秒），0 表示不可用
    pub timestamp_us: u64,
}

impl WinchFrame {
    /// 创建标准帧（ID 截断到 11 bit）
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(u32::from(id) & CAN_SFF_MASK, data, false)
    }

    /// 创建扩展帧（ID 截断到 29 bit）
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id & CAN_EFF_MASK, data, true)
    }

    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed_data = [0u8; FRAME_LEN];
        let len = data.len().min(FRAME_LEN);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            is_extended,
            timestamp_us: 0,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..usize::from(self.len.min(FRAME_LEN as u8))]
    }

    /// 获取 CAN ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 提取 8 字节协议帧
    ///
    /// # 错误
    /// - `DecodeError::BadLength`: DLC 不等于 8
    pub fn payload(&self) -> Result<Frame, DecodeError> {
        Frame::try_from(self.data_slice())
    }
}

impl Frame {
    /// 封装为发往 `motor_id` 的标准帧
    pub fn to_can_frame(self, motor_id: u16) -> WinchFrame {
        WinchFrame::new_standard(motor_id, &self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_try_from_slice() {
        let frame = Frame::try_from(&[0x91, 0, 0, 0, 0, 0, 0, 0][..]).unwrap();
        assert_eq!(frame.opcode(), 0x91);
    }

    #[test]
    fn test_frame_try_from_short_slice() {
        let err = Frame::try_from(&[0x91, 0, 0, 0, 0][..]).unwrap_err();
        assert_eq!(err, DecodeError::BadLength { actual: 5 });
    }

    #[test]
    fn test_frame_try_from_long_slice() {
        let err = Frame::try_from(&[0u8; 9][..]).unwrap_err();
        assert_eq!(err, DecodeError::BadLength { actual: 9 });
    }

    #[test]
    fn test_frame_answers() {
        let request = Frame::new([0xB4, 0x13, 0, 0, 0, 0, 0, 0]);
        let reply = Frame::new([0xB4, 0x13, 0, 0, 0x00, 0x00, 0x80, 0x3F]);
        let other = Frame::new([0xB4, 0x09, 0, 0, 0x00, 0x00, 0x80, 0x3F]);

        assert!(reply.answers(&request));
        assert!(!other.answers(&request));
    }

    #[test]
    fn test_frame_little_endian_accessors() {
        let frame = Frame::new([0x94, 0x00, 0x00, 0xA0, 0xC1, 0xD0, 0x07, 0x00]);
        assert_eq!(frame.f32_at(1), -20.0);
        assert_eq!(frame.u16_at(5), 2000);

        let frame = Frame::new([0xB2, 0, 0, 0, 0x04, 0x01, 0, 0]);
        assert_eq!(frame.u32_at(4), 0x0104);
    }

    #[test]
    #[should_panic]
    fn test_frame_f32_at_past_end_panics() {
        Frame::new([0; 8]).f32_at(5);
    }

    #[test]
    #[should_panic]
    fn test_frame_u16_at_past_end_panics() {
        Frame::new([0; 8]).u16_at(7);
    }

    #[test]
    fn test_frame_display() {
        let frame = Frame::new([0x94, 0x00, 0x00, 0xA0, 0xC1, 0xD0, 0x07, 0x00]);
        assert_eq!(frame.to_string(), "94 00 00 A0 C1 D0 07 00");
    }

    #[test]
    fn test_winch_frame_standard() {
        let frame = WinchFrame::new_standard(0x123, &[1, 2, 3, 4]);
        assert_eq!(frame.id(), 0x123);
        assert_eq!(frame.data_slice(), &[1, 2, 3, 4]);
        assert!(!frame.is_extended);
        assert_eq!(frame.timestamp_us, 0);
    }

    #[test]
    fn test_winch_frame_standard_masks_id() {
        let frame = WinchFrame::new_standard(0xFFFF, &[]);
        assert_eq!(frame.id(), 0x7FF);
    }

    #[test]
    fn test_winch_frame_truncates_data() {
        let frame = WinchFrame::new_extended(0x1234_5678, &[0xAA; 12]);
        assert_eq!(frame.len, 8);
        assert!(frame.is_extended);
    }

    #[test]
    fn test_winch_frame_payload_requires_full_dlc() {
        let frame = WinchFrame::new_standard(0x001, &[0x91, 0, 0]);
        assert_eq!(
            frame.payload().unwrap_err(),
            DecodeError::BadLength { actual: 3 }
        );
    }

    #[test]
    fn test_frame_to_can_frame() {
        let frame = Frame::new([0x92, 0, 0, 0, 0, 0, 0, 0]);
        let can = frame.to_can_frame(1);
        assert_eq!(can.id, 1);
        assert_eq!(can.len, 8);
        assert_eq!(can.payload().unwrap(), frame);
    }
}
