//! 零点位置寄存器

use crate::commands::config::CliConfig;
use crate::connection::ConnectArgs;
use crate::utils::blocking;
use anyhow::Result;
use clap::Subcommand;

/// 零点位置命令
#[derive(Subcommand, Debug, Clone)]
pub enum ZeroCommand {
    /// 读取零点位置寄存器
    Get {
        #[command(flatten)]
        conn: ConnectArgs,
    },

    /// 写入零点位置寄存器
    Set {
        /// 新的零点位置
        #[arg(allow_negative_numbers = true)]
        value: f32,

        /// 跳过确认
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        conn: ConnectArgs,
    },
}

impl ZeroCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        match self {
            ZeroCommand::Get { conn } => {
                let connection = conn.resolve(config);
                blocking(move || {
                    let mut winch = connection.open_winch()?;
                    println!("📍 零点位置: {}", winch.read_zero_position()?);
                    Ok(())
                })
                .await
            },

            ZeroCommand::Set { value, yes, conn } => {
                if !value.is_finite() {
                    anyhow::bail!("零点位置必须是有限值: {}", value);
                }

                if !yes {
                    println!("⚠️  将修改控制器的零点位置寄存器为 {}", value);
                    let confirmed = inquire::Confirm::new("确定要继续吗？")
                        .with_default(false)
                        .prompt()
                        .map_err(|e| anyhow::anyhow!("用户交互失败: {}", e))?;
                    if !confirmed {
                        println!("❌ 操作已取消");
                        return Ok(());
                    }
                }

                let connection = conn.resolve(config);
                blocking(move || {
                    let mut winch = connection.open_winch()?;
                    let before = winch.read_zero_position()?;
                    winch.modify_zero_position(value)?;
                    println!("✅ 零点位置: {} → {}", before, value);
                    Ok(())
                })
                .await
            },
        }
    }
}
