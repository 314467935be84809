//! 应答延迟压力测试
//!
//! 以固定间隔发送同一帧，记录每个匹配应答相对最近一次发送的往返时间，
//! 结束后再等待 `drain` 收集迟到的应答。

use crate::{DriverError, Winch};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use winch_can::{CanAdapter, WinchFrame};
use winch_protocol::Frame;

/// 压力测试参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    /// 发送的帧
    pub frame: Frame,
    /// 发送间隔
    pub interval: Duration,
    /// 发送阶段时长
    pub duration: Duration,
    /// 发送结束后等待迟到应答的时间
    pub drain: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            frame: Frame::new([0xB4, 0x12, 0, 0, 0, 0, 0, 0]),
            interval: Duration::from_millis(10),
            duration: Duration::from_secs(10),
            drain: Duration::from_millis(200),
        }
    }
}

/// 延迟统计报告（时间单位 ms）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyReport {
    pub sent: u64,
    pub received: u64,
    /// 应答率（%）
    pub response_rate: f64,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// 样本标准差（少于 2 个样本时为 0）
    pub std_dev_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    /// 实际应答速率（条/秒）
    pub effective_rate: f64,
    /// 期望速率（条/秒）
    pub expected_rate: f64,
}

impl LatencyReport {
    /// 由往返时间样本计算报告
    pub fn from_samples(
        samples_ms: &[f64],
        sent: u64,
        duration: Duration,
        interval: Duration,
    ) -> Self {
        let received = samples_ms.len() as u64;
        let response_rate = if sent == 0 {
            0.0
        } else {
            received as f64 / sent as f64 * 100.0
        };
        let effective_rate = if duration.is_zero() {
            0.0
        } else {
            received as f64 / duration.as_secs_f64()
        };
        let expected_rate = if interval.is_zero() {
            0.0
        } else {
            1.0 / interval.as_secs_f64()
        };

        let mut sorted = samples_ms.to_vec();
        sorted.sort_by(f64::total_cmp);

        let (mean_ms, min_ms, max_ms) = match (sorted.first(), sorted.last()) {
            (Some(&min), Some(&max)) => (samples_ms.iter().mean(), min, max),
            _ => (0.0, 0.0, 0.0),
        };
        let std_dev_ms = if samples_ms.len() > 1 {
            samples_ms.iter().std_dev()
        } else {
            0.0
        };

        Self {
            sent,
            received,
            response_rate,
            mean_ms,
            min_ms,
            max_ms,
            std_dev_ms,
            p50_ms: percentile(&sorted, 50.0),
            p90_ms: percentile(&sorted, 90.0),
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
            effective_rate,
            expected_rate,
        }
    }
}

/// 线性插值百分位数（输入须已升序；空输入返回 0）
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        },
    }
}

/// 执行压力测试
///
/// `on_response` 对每个匹配应答回调一次（往返时间、应答帧）。`stop` 置位时提前结束
/// 发送阶段，仍会执行 drain。
pub fn run_stress<A: CanAdapter>(
    winch: &mut Winch<A>,
    config: &StressConfig,
    stop: &AtomicBool,
    mut on_response: impl FnMut(Duration, &WinchFrame),
) -> Result<LatencyReport, DriverError> {
    if config.interval.is_zero() {
        return Err(DriverError::InvalidInput("interval must be positive".to_string()));
    }

    info!(
        "Stress test: {} every {:?} for {:?}",
        config.frame, config.interval, config.duration
    );

    let mut samples = Vec::new();
    let mut sent = 0u64;
    let start = Instant::now();
    let mut next_send = start;
    let mut last_sent = start;

    while start.elapsed() < config.duration && !stop.load(Ordering::Relaxed) {
        last_sent = Instant::now();
        winch.send_raw(config.frame)?;
        sent += 1;
        next_send += config.interval;

        while let Some(reply) = winch.wait_reply(&config.frame, next_send)? {
            let rtt = last_sent.elapsed();
            samples.push(rtt.as_secs_f64() * 1000.0);
            on_response(rtt, &reply);
        }
    }
    let active = start.elapsed();

    let drain_deadline = Instant::now() + config.drain;
    while let Some(reply) = winch.wait_reply(&config.frame, drain_deadline)? {
        let rtt = last_sent.elapsed();
        samples.push(rtt.as_secs_f64() * 1000.0);
        on_response(rtt, &reply);
    }

    debug!("Stress test sent {} frames, {} replies", sent, samples.len());
    Ok(LatencyReport::from_samples(
        &samples,
        sent,
        active,
        config.interval,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WinchConfig;
    use proptest::prelude::*;
    use winch_can::MockCanAdapter;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        // numpy.percentile([1, 2, 3, 4], q) 的结果
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_close(percentile(&sorted, 50.0), 2.5);
        assert_close(percentile(&sorted, 90.0), 3.7);
        assert_close(percentile(&sorted, 95.0), 3.85);
        assert_close(percentile(&sorted, 99.0), 3.97);
        assert_close(percentile(&sorted, 0.0), 1.0);
        assert_close(percentile(&sorted, 100.0), 4.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile(&[7.0], 99.0), 7.0);
    }

    #[test]
    fn test_report_statistics() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let report = LatencyReport::from_samples(
            &samples,
            10,
            Duration::from_secs(2),
            Duration::from_millis(10),
        );
        assert_eq!(report.received, 8);
        assert_close(report.response_rate, 80.0);
        assert_close(report.mean_ms, 5.0);
        assert_close(report.min_ms, 2.0);
        assert_close(report.max_ms, 9.0);
        // 样本标准差 sqrt(32 / 7)
        assert_close(report.std_dev_ms, (32.0f64 / 7.0).sqrt());
        assert_close(report.p50_ms, 4.5);
        assert_close(report.effective_rate, 4.0);
        assert_close(report.expected_rate, 100.0);
    }

    #[test]
    fn test_report_json_fields() {
        let report = LatencyReport::from_samples(
            &[1.0, 2.0],
            2,
            Duration::from_secs(1),
            Duration::from_millis(10),
        );
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["sent"], 2);
        assert_eq!(json["received"], 2);
        assert_eq!(json["p50_ms"], 1.5);

        let back: LatencyReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_report_empty_and_single() {
        let empty = LatencyReport::from_samples(&[], 0, Duration::ZERO, Duration::from_millis(10));
        assert_eq!(empty.response_rate, 0.0);
        assert_eq!(empty.mean_ms, 0.0);
        assert_eq!(empty.std_dev_ms, 0.0);

        let single =
            LatencyReport::from_samples(&[3.0], 1, Duration::from_secs(1), Duration::from_millis(10));
        assert_eq!(single.std_dev_ms, 0.0);
        assert_eq!(single.p99_ms, 3.0);
    }

    #[test]
    fn test_run_stress_with_echoing_controller() {
        let adapter = MockCanAdapter::new()
            .with_responder(|frame| vec![WinchFrame::new_standard(0x001, frame.data_slice())]);
        let mut winch = Winch::with_config(adapter, WinchConfig::default());
        let config = StressConfig {
            interval: Duration::from_millis(5),
            duration: Duration::from_millis(50),
            drain: Duration::from_millis(10),
            ..StressConfig::default()
        };
        let stop = AtomicBool::new(false);

        let mut responses = 0;
        let report = run_stress(&mut winch, &config, &stop, |_, reply| {
            assert_eq!(&reply.data[..2], &[0xB4, 0x12]);
            responses += 1;
        })
        .unwrap();

        assert!(report.sent > 0);
        assert_eq!(report.received, report.sent);
        assert_eq!(responses, report.sent);
        assert_close(report.response_rate, 100.0);
        assert_close(report.expected_rate, 200.0);
    }

    #[test]
    fn test_run_stress_stop_flag_and_silent_controller() {
        let mut winch = Winch::new(MockCanAdapter::new());
        let config = StressConfig {
            drain: Duration::from_millis(5),
            ..StressConfig::default()
        };
        let stop = AtomicBool::new(true);
        let report = run_stress(&mut winch, &config, &stop, |_, _| {}).unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.received, 0);
    }

    proptest! {
        #[test]
        fn prop_percentile_within_bounds(
            mut values in prop::collection::vec(0.0f64..1000.0, 1..50),
            p in 0.0f64..=100.0,
        ) {
            values.sort_by(f64::total_cmp);
            let v = percentile(&values, p);
            prop_assert!(v >= values[0] && v <= values[values.len() - 1]);
        }
    }
}
