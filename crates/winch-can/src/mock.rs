//! Mock CAN 适配器
//!
//! 无硬件依赖，用于上层（driver / CLI）测试：
//! - `queue_frame`：预置待接收的帧
//! - `with_responder`：根据发送的帧自动生成应答（模拟控制器）
//! - `sent_frames`：检查已发送的帧

use crate::{CanAdapter, CanError, WinchFrame};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::trace;

/// 应答生成器：输入发送的帧，输出控制器应答（可为空）
pub type Responder = Box<dyn FnMut(&WinchFrame) -> Vec<WinchFrame> + Send>;

/// Mock CAN 适配器
pub struct MockCanAdapter {
    receive_queue: VecDeque<WinchFrame>,
    sent_frames: Vec<WinchFrame>,
    responder: Option<Responder>,
    read_timeout: Duration,
}

impl MockCanAdapter {
    /// 创建空的 Mock 适配器（接收队列为空时立即返回 `Timeout`）
    pub fn new() -> Self {
        Self {
            receive_queue: VecDeque::new(),
            sent_frames: Vec::new(),
            responder: None,
            read_timeout: Duration::ZERO,
        }
    }

    /// 设置自动应答器
    pub fn with_responder(
        mut self,
        responder: impl FnMut(&WinchFrame) -> Vec<WinchFrame> + Send + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// 预置一帧到接收队列
    pub fn queue_frame(&mut self, frame: WinchFrame) {
        self.receive_queue.push_back(frame);
    }

    /// 已发送的帧
    pub fn sent_frames(&self) -> &[WinchFrame] {
        &self.sent_frames
    }

    /// 取出已发送的帧
    pub fn take_sent_frames(&mut self) -> Vec<WinchFrame> {
        std::mem::take(&mut self.sent_frames)
    }

    /// 接收队列中剩余的帧数
    pub fn pending(&self) -> usize {
        self.receive_queue.len()
    }
}

impl Default for MockCanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockCanAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCanAdapter")
            .field("receive_queue", &self.receive_queue.len())
            .field("sent_frames", &self.sent_frames.len())
            .field("responder", &self.responder.is_some())
            .finish()
    }
}

impl CanAdapter for MockCanAdapter {
    fn send(&mut self, frame: WinchFrame) -> Result<(), CanError> {
        trace!("Mock sent frame: ID=0x{:X}, len={}", frame.id, frame.len);
        self.sent_frames.push(frame);
        if let Some(responder) = self.responder.as_mut() {
            self.receive_queue.extend(responder(&frame));
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<WinchFrame, CanError> {
        match self.receive_queue.pop_front() {
            Some(frame) => Ok(frame),
            None => {
                // 模拟真实设备：等待读超时后返回
                if !self.read_timeout.is_zero() {
                    std::thread::sleep(self.read_timeout);
                }
                Err(CanError::Timeout)
            },
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}
