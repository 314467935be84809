//! 力矩监测命令

use crate::commands::config::CliConfig;
use crate::connection::ConnectArgs;
use crate::utils::{blocking, stop_flag, unix_timestamp};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use winch_driver::{DEFAULT_TORQUE_CONSTANT, FilterKind, TorqueMonitor, TorqueMonitorConfig};

/// 滤波器选择
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChoice {
    /// Savitzky-Golay
    Savgol,
    /// 指数移动平均
    Ema,
    /// 一阶 IIR（0.8 / 0.2）
    Iir,
    /// 不滤波
    None,
}

/// 力矩监测参数
#[derive(Args, Debug, Clone)]
pub struct TorqueCommand {
    /// 轮询间隔（毫秒）
    #[arg(long, default_value_t = 50)]
    pub interval_ms: u64,

    /// 力矩常数（N·m/A）
    #[arg(long, default_value_t = DEFAULT_TORQUE_CONSTANT)]
    pub torque_constant: f64,

    /// 滤波器
    #[arg(long, value_enum, default_value_t = FilterChoice::Savgol)]
    pub filter: FilterChoice,

    /// Savitzky-Golay 窗口长度
    #[arg(long, default_value_t = 11)]
    pub window: usize,

    /// Savitzky-Golay 多项式阶数
    #[arg(long, default_value_t = 3)]
    pub order: usize,

    /// EMA 系数
    #[arg(long, default_value_t = 0.2)]
    pub alpha: f64,

    /// 监测时长（秒），默认直到 Ctrl+C
    #[arg(long)]
    pub duration_secs: Option<f64>,

    /// CSV 输出文件（默认 winch_torque_<时间戳>.csv）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub conn: ConnectArgs,
}

impl TorqueCommand {
    /// 监测参数；应答超时取 `--timeout-ms`，其次配置文件，默认 200 ms
    pub fn monitor_config(&self, config: &CliConfig) -> TorqueMonitorConfig {
        let defaults = TorqueMonitorConfig::default();
        let filter = match self.filter {
            FilterChoice::Savgol => FilterKind::SavitzkyGolay {
                window: self.window,
                order: self.order,
            },
            FilterChoice::Ema => FilterKind::Ema { alpha: self.alpha },
            FilterChoice::Iir => FilterKind::DEFAULT_IIR,
            FilterChoice::None => FilterKind::None,
        };
        TorqueMonitorConfig {
            interval: Duration::from_millis(self.interval_ms),
            reply_timeout: self
                .conn
                .timeout_ms
                .or(config.response_timeout_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.reply_timeout),
            torque_constant: self.torque_constant,
            filter,
        }
    }

    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let monitor_config = self.monitor_config(config);
        // 先校验滤波参数，避免连接后才报错
        let monitor = TorqueMonitor::new(monitor_config)?;
        let connection = self.conn.resolve(config);
        let limit = self
            .duration_secs
            .map(Duration::try_from_secs_f64)
            .transpose()
            .context("无效的监测时长")?;
        let output = self
            .output
            .unwrap_or_else(|| PathBuf::from(format!("winch_torque_{}.csv", unix_timestamp())));

        println!("Real-Time Filtered Motor Torque Monitor");
        println!("  力矩常数: {} N·m/A", monitor_config.torque_constant);
        println!("  轮询间隔: {:?}", monitor_config.interval);
        println!("  应答超时: {:?}", monitor_config.reply_timeout);
        println!("  滤波器: {:?}", monitor_config.filter);
        println!("⏳ 连接到 {}（Ctrl+C 停止）...", connection.describe());

        let stop = stop_flag(limit);
        let monitor = blocking(move || {
            let mut winch = connection.open_winch()?;
            let mut monitor = monitor;
            monitor.run(&mut winch, &stop, |s| {
                print!(
                    "\rTime: {:.2}s | Current: {:.2}A (raw: {:.2}A) | Torque: {:.4}Nm",
                    s.time_s, s.current, s.current_raw, s.torque
                );
                let _ = std::io::stdout().flush();
            })?;
            Ok(monitor)
        })
        .await?;
        println!();

        if monitor.samples().is_empty() {
            println!("⚠️  没有采集到数据");
            return Ok(());
        }

        let file = File::create(&output)
            .with_context(|| format!("创建输出文件失败: {}", output.display()))?;
        monitor.write_csv(BufWriter::new(file))?;
        println!(
            "✅ 已保存 {} 个采样点到 {}（{} 次请求无应答）",
            monitor.samples().len(),
            output.display(),
            monitor.missed()
        );
        Ok(())
    }
}
