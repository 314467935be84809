//! # Winch CLI
//!
//! 绞盘电机控制器命令行工具。
//!
//! ## 单次命令
//!
//! ```bash
//! # 配置默认设备
//! winch-cli config set --device /dev/ttyUSB0
//!
//! # 点动：收绳 2 秒后保持当前位置
//! winch-cli jog up --speed 20
//!
//! # 发送原始帧并等待应答
//! winch-cli send B4 13 00 00 00 00 00 00 --wait
//!
//! # 电流/扭矩监测，结果保存为 CSV
//! winch-cli torque --interface can0 --filter ema
//!
//! # 压力测试
//! winch-cli stress --interval-ms 10 --duration-secs 10
//! ```
//!
//! ## 交互式 Shell
//!
//! ```bash
//! $ winch-cli shell --interface can0
//! winch> turn -20
//! winch> position
//! winch> 94 00 00 A0 41 D0 07 00
//! winch> stop
//! winch> exit
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod commands;
mod connection;
mod modes;
mod utils;

use commands::{
    CliConfig, ConfigCommand, HoldCommand, JogCommand, ListenCommand, MotorAction, SendCommand,
    SimpleCommand, StressCommand, TorqueCommand, TurnCommand, ZeroCommand,
};
use connection::ConnectArgs;
use modes::repl::run_repl;

/// Winch CLI - 绞盘电机命令行工具
#[derive(Parser, Debug)]
#[command(name = "winch-cli")]
#[command(about = "Command-line interface for winch motor controllers", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true, env = "WINCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 发送原始 8 字节帧
    Send(SendCommand),

    /// 监听总线并打印收到的帧
    Listen(ListenCommand),

    /// 启动电机
    Start(SimpleCommand),

    /// 停止电机
    Stop(SimpleCommand),

    /// 以指定转速转动
    Turn(TurnCommand),

    /// 位置控制
    Hold(HoldCommand),

    /// 读取当前位置
    Position(SimpleCommand),

    /// 读取 Iq 电流
    Iq(SimpleCommand),

    /// 读取故障状态
    Fault(SimpleCommand),

    /// 零点位置寄存器
    #[command(subcommand)]
    Zero(ZeroCommand),

    /// 点动（转动 → 启动 → 读位置 → 保持）
    Jog(JogCommand),

    /// 电流/扭矩监测
    Torque(TorqueCommand),

    /// 请求/应答压力测试
    Stress(StressCommand),

    /// 启动交互式 Shell
    Shell {
        #[command(flatten)]
        conn: ConnectArgs,
    },
}

fn load_config(explicit: Option<&Path>) -> Result<CliConfig> {
    let path = commands::config::config_file(explicit)?;
    CliConfig::load(&path)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "winch_cli=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let explicit = cli.config.as_deref();

    if let Commands::Config(cmd) = cli.command {
        return cmd.execute(explicit).await;
    }

    let config = load_config(explicit)?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Config(_) => Ok(()),
        Commands::Send(cmd) => cmd.execute(&config).await,
        Commands::Listen(cmd) => cmd.execute(&config).await,
        Commands::Start(cmd) => commands::motor::execute(MotorAction::Start, &cmd.conn, &config).await,
        Commands::Stop(cmd) => commands::motor::execute(MotorAction::Stop, &cmd.conn, &config).await,
        Commands::Turn(cmd) => {
            let action = MotorAction::Turn {
                rpm: cmd.rpm,
                ramp: cmd.ramp,
            };
            commands::motor::execute(action, &cmd.conn, &config).await
        },
        Commands::Hold(cmd) => {
            let action = MotorAction::Hold {
                target: cmd.target,
                duration_ms: cmd.duration_ms,
            };
            commands::motor::execute(action, &cmd.conn, &config).await
        },
        Commands::Position(cmd) => {
            commands::motor::execute(MotorAction::Position, &cmd.conn, &config).await
        },
        Commands::Iq(cmd) => commands::motor::execute(MotorAction::Iq, &cmd.conn, &config).await,
        Commands::Fault(cmd) => {
            commands::motor::execute(MotorAction::Fault, &cmd.conn, &config).await
        },
        Commands::Zero(cmd) => cmd.execute(&config).await,
        Commands::Jog(cmd) => cmd.execute(&config).await,
        Commands::Torque(cmd) => cmd.execute(&config).await,
        Commands::Stress(cmd) => cmd.execute(&config).await,
        Commands::Shell { conn } => run_repl(conn.resolve(&config)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_turn_with_negative_rpm() {
        let cli = Cli::try_parse_from(["winch-cli", "turn", "-20", "--device", "/dev/ttyUSB1"])
            .unwrap();
        match cli.command {
            Commands::Turn(cmd) => {
                assert_eq!(cmd.rpm, -20.0);
                assert_eq!(cmd.ramp, 2000);
                assert_eq!(cmd.conn.device.as_deref(), Some("/dev/ttyUSB1"));
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_interface_conflicts_with_device() {
        let result = Cli::try_parse_from([
            "winch-cli",
            "position",
            "--interface",
            "can0",
            "--device",
            "/dev/ttyUSB0",
        ]);
        assert!(result.is_err());
    }
}
