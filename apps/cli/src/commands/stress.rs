//! 应答延迟压力测试命令

use crate::commands::config::CliConfig;
use crate::connection::ConnectArgs;
use crate::utils::{blocking, stop_flag};
use anyhow::{Context, Result};
use clap::Args;
use std::time::Duration;
use winch_driver::{LatencyReport, StressConfig, run_stress};
use winch_protocol::{format_hex, parse_hex_frame};

/// 压力测试参数
#[derive(Args, Debug, Clone)]
pub struct StressCommand {
    /// 发送的帧（8 个十六进制字节）
    #[arg(long, default_value = "B4 12 00 00 00 00 00 00")]
    pub frame: String,

    /// 发送间隔（毫秒）
    #[arg(long, default_value_t = 10)]
    pub interval_ms: u64,

    /// 测试时长（秒）
    #[arg(long, default_value_t = 10)]
    pub duration_secs: u64,

    /// 不逐条打印应答
    #[arg(short, long)]
    pub quiet: bool,

    /// 以 JSON 输出报告
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub conn: ConnectArgs,
}

impl StressCommand {
    pub fn stress_config(&self) -> Result<StressConfig> {
        let frame = parse_hex_frame(&self.frame)
            .with_context(|| format!("无效的帧: '{}'", self.frame))?;
        if self.interval_ms == 0 {
            anyhow::bail!("发送间隔必须大于 0");
        }
        Ok(StressConfig {
            frame,
            interval: Duration::from_millis(self.interval_ms),
            duration: Duration::from_secs(self.duration_secs),
            ..StressConfig::default()
        })
    }

    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let stress_config = self.stress_config()?;
        let connection = self.conn.resolve(config);
        let verbose = !self.quiet && !self.json;

        if !self.json {
            println!("Starting CAN response time test with command: {}", stress_config.frame);
            println!(
                "Sending every {}ms for {} seconds",
                self.interval_ms, self.duration_secs
            );
            match connection.winch.response_id {
                Some(id) => println!("Looking for responses with ID: 0x{:03X}", id),
                None => println!("Looking for responses with any ID"),
            }
        }

        let stop = stop_flag(None);
        let report = blocking(move || {
            let mut winch = connection.open_winch()?;
            Ok(run_stress(&mut winch, &stress_config, &stop, |rtt, reply| {
                if verbose {
                    println!(
                        "Response time: {:.2}ms | ID: {} | Data: {}",
                        rtt.as_secs_f64() * 1000.0,
                        reply.id,
                        format_hex(reply.data_slice())
                    );
                }
            })?)
        })
        .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

fn print_report(report: &LatencyReport) {
    println!();
    println!("Sent {} messages, received {} responses", report.sent, report.received);
    println!("Response rate: {:.2}%", report.response_rate);

    if report.received == 0 {
        println!("⚠️  No response times collected!");
        return;
    }

    println!();
    println!("===== Response Time Analysis =====");
    println!("Average response time: {:.2}ms", report.mean_ms);
    println!("Minimum response time: {:.2}ms", report.min_ms);
    println!("Maximum response time: {:.2}ms", report.max_ms);
    println!("Standard deviation: {:.2}ms", report.std_dev_ms);
    println!();
    println!("Percentiles:");
    println!("  50th: {:.2}ms", report.p50_ms);
    println!("  90th: {:.2}ms", report.p90_ms);
    println!("  95th: {:.2}ms", report.p95_ms);
    println!("  99th: {:.2}ms", report.p99_ms);
    println!();
    println!("Effective response rate: {:.2} msgs/sec", report.effective_rate);
    println!("Expected rate: {:.2} msgs/sec", report.expected_rate);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> StressCommand {
        StressCommand {
            frame: "B4 12 00 00 00 00 00 00".to_string(),
            interval_ms: 10,
            duration_secs: 10,
            quiet: false,
            json: false,
            conn: ConnectArgs::default(),
        }
    }

    #[test]
    fn test_stress_config_defaults_match_library() {
        assert_eq!(command().stress_config().unwrap(), StressConfig::default());
    }

    #[test]
    fn test_stress_config_rejects_bad_input() {
        let mut cmd = command();
        cmd.frame = "B4 12".to_string();
        assert!(cmd.stress_config().is_err());

        let mut cmd = command();
        cmd.interval_ms = 0;
        assert!(cmd.stress_config().is_err());
    }
}
