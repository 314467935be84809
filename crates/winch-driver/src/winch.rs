//! 请求/应答客户端
//!
//! `Winch` 独占一个 `CanAdapter`，以阻塞方式发送命令并等待应答。应答按前 2 个字节
//! （操作码 + 子码）与请求匹配，无关帧被跳过。

use crate::DriverError;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use winch_can::{CanAdapter, CanError, WinchFrame};
use winch_protocol::{Command, DEFAULT_MOTOR_ID, FaultStatus, Frame, Reply};

/// 客户端配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinchConfig {
    /// 电机 ID（发送帧的 CAN ID）
    pub motor_id: u16,
    /// 应答帧的 CAN ID，`None` 表示接受任意 ID
    pub response_id: Option<u32>,
    /// 等待应答的超时
    pub response_timeout: Duration,
}

impl Default for WinchConfig {
    fn default() -> Self {
        Self {
            motor_id: DEFAULT_MOTOR_ID,
            response_id: None,
            response_timeout: Duration::from_secs(2),
        }
    }
}

/// 绞盘电机客户端
///
/// # 示例
///
/// ```
/// use winch_can::{MockCanAdapter, WinchFrame};
/// use winch_driver::Winch;
///
/// // 模拟控制器：原样回显请求
/// let adapter = MockCanAdapter::new()
///     .with_responder(|frame| vec![WinchFrame::new_standard(0x001, frame.data_slice())]);
///
/// let mut winch = Winch::new(adapter);
/// winch.start().unwrap();
/// ```
#[derive(Debug)]
pub struct Winch<A: CanAdapter> {
    adapter: A,
    config: WinchConfig,
}

impl<A: CanAdapter> Winch<A> {
    /// 使用默认配置创建客户端
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, WinchConfig::default())
    }

    pub fn with_config(adapter: A, config: WinchConfig) -> Self {
        Self { adapter, config }
    }

    pub fn config(&self) -> &WinchConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    /// 取回底层适配器
    pub fn into_inner(self) -> A {
        self.adapter
    }

    /// 发送命令，不等待应答
    pub fn send(&mut self, command: &Command) -> Result<(), DriverError> {
        debug!("Sending {}", command);
        self.send_raw(command.encode())
    }

    /// 发送任意 8 字节帧
    pub fn send_raw(&mut self, frame: Frame) -> Result<(), DriverError> {
        let can_frame = frame.to_can_frame(self.config.motor_id);
        self.adapter.send(can_frame)?;
        trace!("TX 0x{:03X}: {}", can_frame.id, frame);
        Ok(())
    }

    /// 发送命令并等待匹配的应答（使用配置的超时）
    pub fn request(&mut self, command: &Command) -> Result<Reply, DriverError> {
        self.request_with_timeout(command, self.config.response_timeout)
    }

    /// 发送命令并等待匹配的应答
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 超时内未收到匹配的应答
    /// - `DriverError::Decode`: 匹配的应答无法解析
    /// - `DriverError::Can`: 适配器错误
    pub fn request_with_timeout(
        &mut self,
        command: &Command,
        timeout: Duration,
    ) -> Result<Reply, DriverError> {
        debug!("Request {}", command);
        let payload = self.request_raw(command.encode(), timeout)?;
        let reply = Reply::try_from(payload)?;
        debug!("Reply to {}: {}", command.name(), reply);
        Ok(reply)
    }

    /// 发送任意帧并返回匹配的应答载荷
    pub fn request_raw(&mut self, frame: Frame, timeout: Duration) -> Result<Frame, DriverError> {
        let deadline = Instant::now() + timeout;
        self.send_raw(frame)?;
        match self.wait_reply(&frame, deadline)? {
            Some(reply) => reply.payload().map_err(DriverError::from),
            None => {
                debug!("No reply to {} within {:?}", frame, timeout);
                Err(DriverError::Timeout)
            },
        }
    }

    /// 接收直到出现与 `request` 匹配的帧，或到达 `deadline`（返回 `None`）
    ///
    /// 应答 ID 不符或前 2 个字节不匹配的帧被丢弃。
    pub fn wait_reply(
        &mut self,
        request: &Frame,
        deadline: Instant,
    ) -> Result<Option<WinchFrame>, DriverError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let frame = match self.adapter.receive_timeout(remaining) {
                Ok(frame) => frame,
                Err(CanError::Timeout) => continue,
                Err(e) => return Err(e.into()),
            };

            if self.config.response_id.is_some_and(|id| id != frame.id) {
                trace!("Skipping frame from ID 0x{:X}", frame.id);
                continue;
            }

            match frame.payload() {
                Ok(payload) if payload.answers(request) => return Ok(Some(frame)),
                Ok(payload) => trace!("Skipping unrelated frame: {}", payload),
                Err(_) => trace!("Skipping short frame (len={})", frame.len),
            }
        }
    }

    fn expect_ack(&mut self, command: Command) -> Result<(), DriverError> {
        match self.request(&command)? {
            Reply::Ack(_) => Ok(()),
            reply => Err(DriverError::UnexpectedReply {
                request: command.name(),
                reply,
            }),
        }
    }

    fn expect_finite(name: &str, value: f32) -> Result<(), DriverError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(DriverError::InvalidInput(format!("{name} must be finite, got {value}")))
        }
    }

    /// 启动电机
    pub fn start(&mut self) -> Result<(), DriverError> {
        self.expect_ack(Command::Start)
    }

    /// 停止电机
    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.expect_ack(Command::Stop)
    }

    /// 以 `rpm` 转动（默认加减速字段）
    pub fn turn(&mut self, rpm: f32) -> Result<(), DriverError> {
        Self::expect_finite("rpm", rpm)?;
        self.expect_ack(Command::turn(rpm))
    }

    /// 在 `duration` 内运动到 `target`
    pub fn position_control(&mut self, target: f32, duration: Duration) -> Result<(), DriverError> {
        Self::expect_finite("target", target)?;
        self.expect_ack(Command::position_control(target, duration))
    }

    /// 读取当前位置
    pub fn read_position(&mut self) -> Result<f32, DriverError> {
        match self.request(&Command::ReadPosition)? {
            Reply::Position(v) => Ok(v),
            reply => Err(DriverError::UnexpectedReply {
                request: Command::ReadPosition.name(),
                reply,
            }),
        }
    }

    /// 读取 q 轴电流（A）
    pub fn read_iq(&mut self) -> Result<f32, DriverError> {
        self.read_iq_with_timeout(self.config.response_timeout)
    }

    pub fn read_iq_with_timeout(&mut self, timeout: Duration) -> Result<f32, DriverError> {
        match self.request_with_timeout(&Command::ReadIq, timeout)? {
            Reply::Iq(v) => Ok(v),
            reply => Err(DriverError::UnexpectedReply {
                request: Command::ReadIq.name(),
                reply,
            }),
        }
    }

    /// 读取零点位置寄存器
    pub fn read_zero_position(&mut self) -> Result<f32, DriverError> {
        match self.request(&Command::ReadZeroPosition)? {
            Reply::ZeroPosition(v) => Ok(v),
            reply => Err(DriverError::UnexpectedReply {
                request: Command::ReadZeroPosition.name(),
                reply,
            }),
        }
    }

    /// 写入零点位置寄存器
    pub fn modify_zero_position(&mut self, value: f32) -> Result<(), DriverError> {
        Self::expect_finite("zero position", value)?;
        self.expect_ack(Command::ModifyZeroPosition(value))
    }

    /// 查询故障状态
    pub fn get_fault(&mut self) -> Result<FaultStatus, DriverError> {
        match self.request(&Command::GetFault)? {
            Reply::Fault(status) => Ok(status),
            reply => Err(DriverError::UnexpectedReply {
                request: Command::GetFault.name(),
                reply,
            }),
        }
    }
}
