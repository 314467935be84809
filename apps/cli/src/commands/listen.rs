//! 监听总线上的所有帧

use crate::commands::config::CliConfig;
use crate::connection::ConnectArgs;
use crate::utils::{blocking, stop_flag};
use anyhow::{Context, Result};
use clap::Args;
use std::sync::atomic::Ordering;
use std::time::Duration;
use winch_can::{CanAdapter, CanError, WinchFrame};
use winch_protocol::{Reply, format_hex};

/// 监听参数
#[derive(Args, Debug, Clone)]
pub struct ListenCommand {
    /// 收到指定数量的帧后退出
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// 监听时长（秒），默认直到 Ctrl+C
    #[arg(long)]
    pub duration_secs: Option<f64>,

    #[command(flatten)]
    pub conn: ConnectArgs,
}

/// 单行帧描述：`ID 0x001: B4 13 00 00 00 00 80 3F (position=1)`
pub fn describe_frame(frame: &WinchFrame) -> String {
    let hex = format_hex(frame.data_slice());
    match frame.payload().ok().and_then(|p| Reply::try_from(p).ok()) {
        Some(reply) => format!("ID 0x{:03X}: {} ({})", frame.id, hex, reply),
        None => format!("ID 0x{:03X}: {}", frame.id, hex),
    }
}

impl ListenCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let connection = self.conn.resolve(config);
        let limit = self
            .duration_secs
            .map(Duration::try_from_secs_f64)
            .transpose()
            .context("无效的监听时长")?;
        let count = self.count;
        let stop = stop_flag(limit);

        println!("👂 监听 {}（Ctrl+C 退出）...", connection.describe());

        blocking(move || {
            let mut adapter = connection.open()?;
            let mut received = 0u64;
            while !stop.load(Ordering::Relaxed) {
                match adapter.receive_timeout(Duration::from_millis(100)) {
                    Ok(frame) => {
                        received += 1;
                        println!("📥 {}", describe_frame(&frame));
                        if count.is_some_and(|n| received >= n) {
                            break;
                        }
                    },
                    Err(CanError::Timeout) => {},
                    Err(e) => return Err(e.into()),
                }
            }
            println!("共收到 {} 帧", received);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_frame_decodes_replies() {
        let mut data = [0xB4, 0x13, 0, 0, 0, 0, 0, 0];
        data[4..].copy_from_slice(&1.0f32.to_le_bytes());
        let frame = WinchFrame::new_standard(0x001, &data);
        assert_eq!(
            describe_frame(&frame),
            "ID 0x001: B4 13 00 00 00 00 80 3F (position=1)"
        );
    }

    #[test]
    fn test_describe_frame_raw() {
        let frame = WinchFrame::new_standard(0x700, &[0x05]);
        assert_eq!(describe_frame(&frame), "ID 0x700: 05");
    }
}
