//! 驱动层错误类型定义

use winch_can::CanError;
use winch_protocol::{DecodeError, Reply};
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// CAN 适配器错误
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 应答帧解析错误
    #[error("Protocol error: {0}")]
    Decode(#[from] DecodeError),

    /// 等待应答超时
    #[error("Operation timeout")]
    Timeout,

    /// 收到匹配的应答，但类型与请求不符
    #[error("Unexpected reply to {request}: {reply}")]
    UnexpectedReply {
        request: &'static str,
        reply: Reply,
    },

    /// 无效输入（如非有限数值）
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DriverError {
    /// 是否为"无应答"类错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout | DriverError::Can(CanError::Timeout))
    }
}
