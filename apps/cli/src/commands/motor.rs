//! 单条电机命令：start / stop / turn / hold / position / iq / fault

use crate::commands::config::CliConfig;
use crate::connection::ConnectArgs;
use crate::utils::blocking;
use anyhow::Result;
use clap::Args;
use winch_protocol::{Command, DEFAULT_HOLD_DURATION, DEFAULT_TURN_RAMP};

/// 仅需连接参数的命令
#[derive(Args, Debug, Clone, Default)]
pub struct SimpleCommand {
    #[command(flatten)]
    pub conn: ConnectArgs,
}

/// 以指定转速转动
#[derive(Args, Debug, Clone)]
pub struct TurnCommand {
    /// 转速（RPM，负值为收绳方向）
    #[arg(allow_negative_numbers = true)]
    pub rpm: f32,

    /// 加减速字段
    #[arg(long, default_value_t = DEFAULT_TURN_RAMP)]
    pub ramp: u16,

    #[command(flatten)]
    pub conn: ConnectArgs,
}

/// 位置控制（保持在目标位置）
#[derive(Args, Debug, Clone)]
pub struct HoldCommand {
    /// 目标位置
    #[arg(allow_negative_numbers = true)]
    pub target: f32,

    /// 运动时间（毫秒）
    #[arg(long, default_value_t = DEFAULT_HOLD_DURATION)]
    pub duration_ms: u16,

    #[command(flatten)]
    pub conn: ConnectArgs,
}

/// 请求/应答类命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorAction {
    Start,
    Stop,
    Turn { rpm: f32, ramp: u16 },
    Hold { target: f32, duration_ms: u16 },
    Position,
    Iq,
    Fault,
}

impl MotorAction {
    fn command(self) -> Command {
        match self {
            MotorAction::Start => Command::Start,
            MotorAction::Stop => Command::Stop,
            MotorAction::Turn { rpm, ramp } => Command::Turn { rpm, ramp },
            MotorAction::Hold {
                target,
                duration_ms,
            } => Command::PositionControl {
                target,
                duration_ms,
            },
            MotorAction::Position => Command::ReadPosition,
            MotorAction::Iq => Command::ReadIq,
            MotorAction::Fault => Command::GetFault,
        }
    }
}

/// 执行一条命令并打印应答
pub async fn execute(action: MotorAction, conn: &ConnectArgs, config: &CliConfig) -> Result<()> {
    let connection = conn.resolve(config);
    let command = action.command();
    match command {
        Command::Turn { rpm: value, .. } | Command::PositionControl { target: value, .. }
            if !value.is_finite() =>
        {
            anyhow::bail!("数值必须是有限值: {}", value);
        },
        _ => {},
    }

    println!("⏳ 连接到 {}...", connection.describe());

    blocking(move || {
        let mut winch = connection.open_winch()?;
        println!("📤 {} [{}]", command, command.encode());
        if let Some(secs) = command.duration_secs() {
            println!("  运动时间: {:.3}s", secs);
        }

        match action {
            MotorAction::Position => println!("📍 当前位置: {}", winch.read_position()?),
            MotorAction::Iq => {
                let iq = winch.read_iq()?;
                println!("⚡ Iq: {:.3} A", iq);
            },
            MotorAction::Fault => {
                let status = winch.get_fault()?;
                if status.is_ok() {
                    println!("✅ 无故障");
                } else {
                    println!("⚠️  {}", status);
                    for bit in status.active_bits() {
                        println!("  bit {}", bit);
                    }
                }
            },
            _ => {
                let reply = winch.request(&command)?;
                println!("✅ 应答: {}", reply);
            },
        }
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_maps_to_command() {
        assert_eq!(MotorAction::Start.command(), Command::Start);
        assert_eq!(
            MotorAction::Turn {
                rpm: -20.0,
                ramp: 2000
            }
            .command()
            .encode()
            .to_string(),
            "94 00 00 A0 C1 D0 07 00"
        );
        assert_eq!(
            MotorAction::Hold {
                target: 1.0,
                duration_ms: 0x1432
            }
            .command(),
            Command::PositionControl {
                target: 1.0,
                duration_ms: 0x1432
            }
        );
    }
}
