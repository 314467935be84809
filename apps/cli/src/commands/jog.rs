//! 点动命令：转动 → 启动 → 运行 → 读取位置 → 保持

use crate::commands::config::CliConfig;
use crate::connection::ConnectArgs;
use crate::utils::blocking;
use anyhow::Result;
use clap::{Args, ValueEnum};
use std::time::Duration;
use winch_driver::{Direction, JogConfig, jog};
use winch_protocol::{DEFAULT_HOLD_DURATION, DEFAULT_TURN_RAMP};

/// 点动方向
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogDirection {
    /// 收绳（-rpm）
    Up,
    /// 放绳（+rpm）
    Down,
}

impl From<JogDirection> for Direction {
    fn from(direction: JogDirection) -> Self {
        match direction {
            JogDirection::Up => Direction::Up,
            JogDirection::Down => Direction::Down,
        }
    }
}

/// 点动参数
#[derive(Args, Debug, Clone)]
pub struct JogCommand {
    /// 方向
    #[arg(value_enum)]
    pub direction: JogDirection,

    /// 转速绝对值（RPM）
    #[arg(short, long, default_value_t = 20.0)]
    pub speed: f32,

    /// 运行时间（毫秒）
    #[arg(long, default_value_t = 2000)]
    pub run_ms: u64,

    /// 加减速字段
    #[arg(long, default_value_t = DEFAULT_TURN_RAMP)]
    pub ramp: u16,

    /// 保持位置时的时间字段
    #[arg(long, default_value_t = DEFAULT_HOLD_DURATION)]
    pub hold_ms: u16,

    /// 以 JSON 输出结果
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub conn: ConnectArgs,
}

impl JogCommand {
    pub fn jog_config(&self) -> JogConfig {
        JogConfig {
            direction: self.direction.into(),
            speed: self.speed,
            ramp: self.ramp,
            run_for: Duration::from_millis(self.run_ms),
            hold_ms: self.hold_ms,
        }
    }

    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let jog_config = self.jog_config();
        let connection = self.conn.resolve(config);
        let json = self.json;

        if !json {
            println!(
                "⏳ 点动 {}：{} rpm，运行 {:?}（{}）",
                jog_config.direction,
                jog_config.rpm(),
                jog_config.run_for,
                connection.describe()
            );
        }

        let outcome = blocking(move || {
            let mut winch = connection.open_winch()?;
            Ok(jog(&mut winch, &jog_config)?)
        })
        .await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            return Ok(());
        }

        let mark = |ok: bool| if ok { "✅" } else { "⚠️  无应答" };
        println!("  转速命令: {}", mark(outcome.turn_acknowledged));
        println!("  启动命令: {}", mark(outcome.start_acknowledged));
        println!("📍 停止位置: {}", outcome.position);
        println!("  保持命令: {}", mark(outcome.hold_acknowledged));
        println!("✅ 点动完成");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jog_config_from_args() {
        let cmd = JogCommand {
            direction: JogDirection::Up,
            speed: 20.0,
            run_ms: 1500,
            ramp: 2000,
            hold_ms: 0x1432,
            json: false,
            conn: ConnectArgs::default(),
        };
        let config = cmd.jog_config();
        assert_eq!(config.rpm(), -20.0);
        assert_eq!(config.run_for, Duration::from_millis(1500));
        assert_eq!(config.hold_ms, 0x1432);
    }
}
