//! REPL 模式（交互式 Shell）
//!
//! - 专用输入线程（rustyline，保留历史记录）+ crossbeam 通道
//! - 后台监听线程：独占 RX 半边，打印总线上收到的所有帧
//! - 主循环独占 TX 半边：命令只发送，不等待应答（应答由监听线程打印）
//!
//! Ctrl+C 发送 Stop 命令。

use crate::commands::listen::describe_frame;
use crate::connection::{BoxedRx, BoxedTx, Connection};
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, bounded};
use rustyline::Editor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use winch_can::{CanError, RxAdapter, TxAdapter};
use winch_protocol::{
    Command, DEFAULT_HOLD_DURATION, DEFAULT_TURN_RAMP, Frame, parse_hex_bytes, parse_hex_frame,
};

/// Shell 中的一条指令
#[derive(Debug, Clone, PartialEq)]
pub enum ShellAction {
    /// 发送命令
    Send(Command),
    /// 发送原始帧
    Raw(Frame),
    Help,
    Exit,
}

/// 解析一行输入
pub fn parse_line(line: &str) -> Result<ShellAction> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        anyhow::bail!("空命令");
    };

    let number = |idx: usize, name: &str| -> Result<f32> {
        let text = parts
            .get(idx)
            .ok_or_else(|| anyhow::anyhow!("缺少参数: {}", name))?;
        let value: f32 = text.parse().with_context(|| format!("无效的{}: {}", name, text))?;
        if !value.is_finite() {
            anyhow::bail!("{}必须是有限值", name);
        }
        Ok(value)
    };
    let optional_u16 = |idx: usize, default: u16| -> Result<u16> {
        match parts.get(idx) {
            Some(text) => text.parse().with_context(|| format!("无效的整数: {}", text)),
            None => Ok(default),
        }
    };

    let action = match head.to_ascii_lowercase().as_str() {
        "help" | "?" => ShellAction::Help,
        "exit" | "quit" => ShellAction::Exit,
        "start" => ShellAction::Send(Command::Start),
        "stop" => ShellAction::Send(Command::Stop),
        "turn" => ShellAction::Send(Command::Turn {
            rpm: number(1, "转速")?,
            ramp: optional_u16(2, DEFAULT_TURN_RAMP)?,
        }),
        "hold" => ShellAction::Send(Command::PositionControl {
            target: number(1, "目标位置")?,
            duration_ms: optional_u16(2, DEFAULT_HOLD_DURATION)?,
        }),
        "position" | "pos" => ShellAction::Send(Command::ReadPosition),
        "iq" => ShellAction::Send(Command::ReadIq),
        "fault" => ShellAction::Send(Command::GetFault),
        "zero" => match parts.get(1).copied() {
            None | Some("get") => ShellAction::Send(Command::ReadZeroPosition),
            Some("set") => {
                let value = number(2, "零点位置")?;
                if parts.get(3).copied() != Some("--yes") {
                    anyhow::bail!("修改零点位置需要确认: zero set {} --yes", value);
                }
                ShellAction::Send(Command::ModifyZeroPosition(value))
            },
            Some(other) => anyhow::bail!("未知的 zero 子命令: {}", other),
        },
        _ => {
            // 其余输入按十六进制字节解析
            if parse_hex_bytes(line).is_err() {
                anyhow::bail!("未知命令: {}", head);
            }
            ShellAction::Raw(parse_hex_frame(line)?)
        },
    };
    Ok(action)
}

fn print_help() {
    println!("可用命令:");
    println!("  <8 个十六进制字节>        发送原始帧，如 94 00 00 A0 C1 D0 07 00");
    println!("  start | stop              启动 / 停止电机");
    println!("  turn <rpm> [ramp]         以指定转速转动");
    println!("  hold <target> [ms]        位置控制");
    println!("  position | iq | fault     读取位置 / Iq / 故障");
    println!("  zero [get]                读取零点位置");
    println!("  zero set <value> --yes    修改零点位置");
    println!("  help | exit");
    println!("Ctrl+C 发送 stop");
}

/// REPL 输入（专用输入线程）
pub struct ReplInput {
    command_rx: Receiver<String>,
    _input_thread: thread::JoinHandle<Result<()>>,
}

impl ReplInput {
    /// 创建专用输入线程（保留历史记录）
    pub fn new() -> Self {
        let (command_tx, command_rx) = bounded::<String>(10);

        // Editor 在输入线程内创建，生命周期与会话相同
        let input_thread = thread::spawn(move || {
            use rustyline::history::DefaultHistory;

            let mut rl = Editor::<(), DefaultHistory>::new()
                .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;

            let history_path = ".winch_history";
            rl.load_history(history_path).ok(); // 首次运行没有历史文件

            println!("Winch CLI v{} - 交互式 Shell", env!("CARGO_PKG_VERSION"));
            println!("输入 'help' 查看帮助，'exit' 退出");
            println!();

            loop {
                match rl.readline("winch> ") {
                    Ok(line) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }

                        if line == "exit" || line == "quit" {
                            rl.save_history(history_path).ok();
                            let _ = command_tx.send(line);
                            break;
                        }

                        let _ = rl.add_history_entry(line.clone());
                        if command_tx.send(line).is_err() {
                            break; // 主循环已退出
                        }
                    },

                    Err(rustyline::error::ReadlineError::Interrupted) => {
                        println!("^C");
                        let _ = command_tx.send("SIGINT".to_string());
                    },

                    Err(rustyline::error::ReadlineError::Eof) => {
                        rl.save_history(history_path).ok();
                        let _ = command_tx.send("exit".to_string());
                        break;
                    },

                    Err(err) => {
                        eprintln!("Error: {:?}", err);
                        break;
                    },
                }
            }

            Ok(())
        });

        Self {
            command_rx,
            _input_thread: input_thread,
        }
    }

    /// 等待用户输入（在 tokio 任务中使用）
    pub async fn recv_command(&self) -> Option<String> {
        let rx = self.command_rx.clone();
        tokio::task::spawn_blocking(move || rx.recv())
            .await
            .ok()
            .and_then(|result| result.ok())
    }
}

/// 后台监听线程
fn spawn_listener(mut rx: BoxedRx, stop: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            match rx.receive() {
                Ok(frame) => println!("\r📥 {}", describe_frame(&frame)),
                Err(CanError::Timeout) => {},
                Err(e) => {
                    eprintln!("\r❌ 接收错误: {}", e);
                    if matches!(e, CanError::BusOff | CanError::Io(_)) {
                        break;
                    }
                },
            }
        }
    })
}

/// Shell 会话（独占 TX 半边）
struct ReplSession {
    tx: BoxedTx,
    motor_id: u16,
}

impl ReplSession {
    fn send(&mut self, frame: Frame) -> Result<()> {
        self.tx.send(frame.to_can_frame(self.motor_id))?;
        println!("📤 ID {}: {}", self.motor_id, frame);
        Ok(())
    }
}

/// 运行 REPL 模式
pub async fn run_repl(connection: Connection) -> Result<()> {
    println!("⏳ 连接到 {}...", connection.describe());
    let (rx, tx) = connection.open_split()?;
    println!("✅ 已连接");

    let stop = Arc::new(AtomicBool::new(false));
    let listener = spawn_listener(rx, Arc::clone(&stop));
    let mut session = ReplSession {
        tx,
        motor_id: connection.winch.motor_id,
    };
    let input = ReplInput::new();

    loop {
        tokio::select! {
            line = input.recv_command() => {
                let Some(line) = line else { break };

                if line == "SIGINT" {
                    eprintln!("🛑 发送 stop");
                    if let Err(err) = session.send(Command::Stop.encode()) {
                        eprintln!("❌ Error: {}", err);
                    }
                    continue;
                }

                match parse_line(&line) {
                    Ok(ShellAction::Exit) => {
                        println!("👋 再见！");
                        break;
                    },
                    Ok(ShellAction::Help) => print_help(),
                    Ok(ShellAction::Send(command)) => {
                        if let Err(err) = session.send(command.encode()) {
                            eprintln!("❌ Error: {}", err);
                        }
                    },
                    Ok(ShellAction::Raw(frame)) => {
                        if let Err(err) = session.send(frame) {
                            eprintln!("❌ Error: {}", err);
                        }
                    },
                    Err(err) => {
                        eprintln!("❌ Error: {}", err);
                        eprintln!("💡 输入 'help' 查看可用命令");
                    },
                }
            }

            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n🛑 收到 Ctrl+C，发送 stop 并退出");
                if let Err(err) = session.send(Command::Stop.encode()) {
                    eprintln!("❌ Error: {}", err);
                }
                break;
            }
        }
    }

    stop.store(true, Ordering::Relaxed);
    let _ = listener.join();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_commands() {
        assert_eq!(parse_line("start").unwrap(), ShellAction::Send(Command::Start));
        assert_eq!(parse_line("STOP").unwrap(), ShellAction::Send(Command::Stop));
        assert_eq!(
            parse_line("turn -20").unwrap(),
            ShellAction::Send(Command::Turn {
                rpm: -20.0,
                ramp: 2000
            })
        );
        assert_eq!(
            parse_line("hold 1.5 1000").unwrap(),
            ShellAction::Send(Command::PositionControl {
                target: 1.5,
                duration_ms: 1000
            })
        );
        assert_eq!(parse_line("zero").unwrap(), ShellAction::Send(Command::ReadZeroPosition));
        assert_eq!(parse_line("exit").unwrap(), ShellAction::Exit);
    }

    #[test]
    fn test_parse_raw_frame() {
        assert_eq!(
            parse_line("94 00 00 A0 C1 D0 07 00").unwrap(),
            ShellAction::Raw(Frame::new([0x94, 0x00, 0x00, 0xA0, 0xC1, 0xD0, 0x07, 0x00]))
        );
        // 字节数不对
        assert!(parse_line("91 00 00").is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("").is_err());
        assert!(parse_line("dance").is_err());
        assert!(parse_line("turn").is_err());
        assert!(parse_line("turn fast").is_err());
        assert!(parse_line("turn NaN").is_err());
        assert!(parse_line("zero set 1.0").is_err());
        assert_eq!(
            parse_line("zero set 1.0 --yes").unwrap(),
            ShellAction::Send(Command::ModifyZeroPosition(1.0))
        );
    }
}
