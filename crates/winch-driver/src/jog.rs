//! 点动序列
//!
//! 1. `Turn(rpm, ramp)`：无应答时告警并继续
//! 2. `Start`：无应答时告警并继续
//! 3. 运行 `run_for`
//! 4. `ReadPosition`：失败时发送 `Stop` 并中止
//! 5. `PositionControl(position, hold)`：保持在到达的位置

use crate::{DriverError, Winch};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};
use winch_can::CanAdapter;
use winch_protocol::{Command, DEFAULT_HOLD_DURATION, DEFAULT_TURN_RAMP};

/// 点动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// 收绳（负转速）
    Up,
    /// 放绳（正转速）
    Down,
}

impl Direction {
    /// 带符号的转速
    pub fn signed_rpm(self, speed: f32) -> f32 {
        match self {
            Direction::Up => -speed.abs(),
            Direction::Down => speed.abs(),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

/// 点动参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JogConfig {
    pub direction: Direction,
    /// 转速绝对值（RPM）
    pub speed: f32,
    /// 加减速字段
    pub ramp: u16,
    /// 运行时间
    pub run_for: Duration,
    /// 保持位置时 PositionControl 的时间字段
    pub hold_ms: u16,
}

impl JogConfig {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            speed: 20.0,
            ramp: DEFAULT_TURN_RAMP,
            run_for: Duration::from_secs(2),
            hold_ms: DEFAULT_HOLD_DURATION,
        }
    }

    pub fn rpm(&self) -> f32 {
        self.direction.signed_rpm(self.speed)
    }
}

/// 点动结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JogOutcome {
    pub rpm: f32,
    /// 停止时读到的位置（已作为保持目标）
    pub position: f32,
    pub turn_acknowledged: bool,
    pub start_acknowledged: bool,
    pub hold_acknowledged: bool,
}

/// 执行点动序列
///
/// # 错误
/// - `DriverError::Timeout`: 读取位置无应答（发送 `Stop` 后中止，不发送保持命令）
/// - `DriverError::InvalidInput`: 转速非有限值
/// - 其它适配器错误
pub fn jog<A: CanAdapter>(
    winch: &mut Winch<A>,
    config: &JogConfig,
) -> Result<JogOutcome, DriverError> {
    let rpm = config.rpm();
    if !rpm.is_finite() {
        return Err(DriverError::InvalidInput(format!("rpm must be finite, got {rpm}")));
    }

    info!("Jog {} at {} rpm for {:?}", config.direction, rpm, config.run_for);

    let turn_acknowledged = tolerate_silence(winch.request(&Command::Turn {
        rpm,
        ramp: config.ramp,
    }))?;
    let start_acknowledged = tolerate_silence(winch.request(&Command::Start))?;

    std::thread::sleep(config.run_for);

    let position = match winch.read_position() {
        Ok(position) => position,
        Err(e) => {
            // 电机仍在转动
            warn!("Failed to read position ({}), sending stop", e);
            if let Err(stop_err) = winch.send(&Command::Stop) {
                warn!("Failed to send stop: {}", stop_err);
            }
            return Err(e);
        },
    };
    info!("Reached position {}", position);

    let hold_acknowledged = tolerate_silence(winch.request(&Command::PositionControl {
        target: position,
        duration_ms: config.hold_ms,
    }))?;

    Ok(JogOutcome {
        rpm,
        position,
        turn_acknowledged,
        start_acknowledged,
        hold_acknowledged,
    })
}

/// 无应答视为告警，其它错误照常返回
fn tolerate_silence<T>(result: Result<T, DriverError>) -> Result<bool, DriverError> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if e.is_timeout() => {
            warn!("No response received, continuing");
            Ok(false)
        },
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WinchConfig;
    use winch_can::{MockCanAdapter, WinchFrame};

    fn quick(direction: Direction) -> JogConfig {
        JogConfig {
            run_for: Duration::ZERO,
            ..JogConfig::new(direction)
        }
    }

    fn quick_winch(adapter: MockCanAdapter) -> Winch<MockCanAdapter> {
        Winch::with_config(
            adapter,
            WinchConfig {
                response_timeout: Duration::from_millis(20),
                ..WinchConfig::default()
            },
        )
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::Up.signed_rpm(20.0), -20.0);
        assert_eq!(Direction::Up.signed_rpm(-20.0), -20.0);
        assert_eq!(Direction::Down.signed_rpm(20.0), 20.0);
        assert_eq!(JogConfig::new(Direction::Down).rpm(), 20.0);
    }

    #[test]
    fn test_jog_without_turn_and_start_replies_continues() {
        let adapter = MockCanAdapter::new().with_responder(|frame| {
            if frame.data[0] == 0xB4 {
                let mut data = [0xB4, 0x13, 0, 0, 0, 0, 0, 0];
                data[4..].copy_from_slice(&7.0f32.to_le_bytes());
                vec![WinchFrame::new_standard(0x001, &data)]
            } else {
                Vec::new()
            }
        });
        let mut winch = quick_winch(adapter);

        let outcome = jog(&mut winch, &quick(Direction::Up)).unwrap();
        assert!(!outcome.turn_acknowledged);
        assert!(!outcome.start_acknowledged);
        assert!(!outcome.hold_acknowledged);
        assert_eq!(outcome.position, 7.0);

        let opcodes: Vec<u8> = winch.adapter().sent_frames().iter().map(|f| f.data[0]).collect();
        assert_eq!(opcodes, vec![0x94, 0x91, 0xB4, 0x95]);
    }

    #[test]
    fn test_jog_aborts_without_position() {
        // 位置请求无应答，其余原样回显
        let adapter = MockCanAdapter::new().with_responder(|frame| {
            if frame.data[0] == 0xB4 {
                Vec::new()
            } else {
                vec![WinchFrame::new_standard(0x001, frame.data_slice())]
            }
        });
        let mut winch = quick_winch(adapter);

        let err = jog(&mut winch, &quick(Direction::Down)).unwrap_err();
        assert!(matches!(err, DriverError::Timeout));

        let opcodes: Vec<u8> = winch.adapter().sent_frames().iter().map(|f| f.data[0]).collect();
        assert_eq!(opcodes, vec![0x94, 0x91, 0xB4, 0x92]);
        assert_eq!(
            winch.adapter().sent_frames().last().unwrap().data,
            [0x92, 0, 0, 0, 0, 0, 0, 0]
        );
    }
}
