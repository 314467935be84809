//! 发送原始 8 字节帧

use crate::commands::config::CliConfig;
use crate::connection::ConnectArgs;
use crate::utils::blocking;
use anyhow::{Context, Result};
use clap::Args;
use std::time::Duration;
use winch_protocol::{Command, Reply, parse_hex_frame};

/// 发送原始帧
#[derive(Args, Debug, Clone)]
pub struct SendCommand {
    /// 8 个十六进制字节，如 "94 00 00 A0 C1 D0 07 00"
    #[arg(required = true, num_args = 1..)]
    pub bytes: Vec<String>,

    /// 等待匹配的应答（前 2 字节相同）
    #[arg(short, long)]
    pub wait: bool,

    #[command(flatten)]
    pub conn: ConnectArgs,
}

impl SendCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let text = self.bytes.join(" ");
        let frame = parse_hex_frame(&text).with_context(|| format!("无效的帧: '{text}'"))?;
        let connection = self.conn.resolve(config);
        let wait = self.wait;

        blocking(move || {
            let mut winch = connection.open_winch()?;
            let id = winch.config().motor_id;

            match Command::try_from(frame) {
                Ok(command) => println!("📤 ID {}: {} ({})", id, frame, command),
                Err(_) => println!("📤 ID {}: {}", id, frame),
            }

            if !wait {
                winch.send_raw(frame)?;
                return Ok(());
            }

            let timeout: Duration = winch.config().response_timeout;
            let reply = winch.request_raw(frame, timeout)?;
            match Reply::try_from(reply) {
                Ok(decoded) => println!("📥 {} ({})", reply, decoded),
                Err(_) => println!("📥 {}", reply),
            }
            Ok(())
        })
        .await
    }
}
