//! 力矩监测
//!
//! 周期性读取 Iq，按 `torque = Iq × Kt` 换算力矩，电流和力矩分别滤波后记录。
//! 记录可导出为 CSV（`time,current_raw,current,torque_raw,torque`）。

use crate::filter::{FilterKind, SignalFilter};
use crate::{DriverError, Winch};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use winch_can::CanAdapter;

/// 默认力矩常数（N·m/A）
pub const DEFAULT_TORQUE_CONSTANT: f64 = 0.065;

/// 力矩监测参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorqueMonitorConfig {
    /// 轮询间隔
    pub interval: Duration,
    /// 单次 Iq 请求的应答超时
    pub reply_timeout: Duration,
    /// 力矩常数（N·m/A）
    pub torque_constant: f64,
    pub filter: FilterKind,
}

impl Default for TorqueMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(50),
            reply_timeout: Duration::from_millis(200),
            torque_constant: DEFAULT_TORQUE_CONSTANT,
            filter: FilterKind::default(),
        }
    }
}

/// 单个采样点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorqueSample {
    /// 自监测开始的秒数
    pub time_s: f64,
    /// 原始 Iq（A）
    pub current_raw: f64,
    /// 滤波后 Iq（A）
    pub current: f64,
    /// 原始力矩（N·m）
    pub torque_raw: f64,
    /// 滤波后力矩（N·m）
    pub torque: f64,
}

/// 力矩监测器
#[derive(Debug)]
pub struct TorqueMonitor {
    config: TorqueMonitorConfig,
    current_filter: SignalFilter,
    torque_filter: SignalFilter,
    samples: Vec<TorqueSample>,
    missed: u64,
}

impl TorqueMonitor {
    /// # 错误
    /// - `DriverError::InvalidInput`: 滤波参数非法
    pub fn new(config: TorqueMonitorConfig) -> Result<Self, DriverError> {
        Ok(Self {
            current_filter: SignalFilter::new(config.filter)?,
            torque_filter: SignalFilter::new(config.filter)?,
            config,
            samples: Vec::new(),
            missed: 0,
        })
    }

    pub fn config(&self) -> &TorqueMonitorConfig {
        &self.config
    }

    /// 记录一个 Iq 读数
    pub fn record(&mut self, elapsed: Duration, current_raw: f64) -> TorqueSample {
        let torque_raw = current_raw * self.config.torque_constant;
        let sample = TorqueSample {
            time_s: elapsed.as_secs_f64(),
            current_raw,
            current: self.current_filter.update(current_raw),
            torque_raw,
            torque: self.torque_filter.update(torque_raw),
        };
        self.samples.push(sample);
        sample
    }

    /// 轮询一次；无应答返回 `Ok(None)`
    pub fn poll<A: CanAdapter>(
        &mut self,
        winch: &mut Winch<A>,
        elapsed: Duration,
    ) -> Result<Option<TorqueSample>, DriverError> {
        match winch.read_iq_with_timeout(self.config.reply_timeout) {
            Ok(iq) => Ok(Some(self.record(elapsed, f64::from(iq)))),
            Err(e) if e.is_timeout() => {
                self.missed += 1;
                debug!("Iq request unanswered ({} missed)", self.missed);
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    /// 持续轮询直到 `stop` 被置位
    ///
    /// 每个采样点回调一次 `on_sample`。
    pub fn run<A: CanAdapter>(
        &mut self,
        winch: &mut Winch<A>,
        stop: &AtomicBool,
        mut on_sample: impl FnMut(&TorqueSample),
    ) -> Result<(), DriverError> {
        let start = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            if let Some(sample) = self.poll(winch, start.elapsed())? {
                on_sample(&sample);
            }
            std::thread::sleep(self.config.interval);
        }
        if self.missed > 0 {
            warn!("{} Iq requests went unanswered", self.missed);
        }
        Ok(())
    }

    pub fn samples(&self) -> &[TorqueSample] {
        &self.samples
    }

    /// 无应答的请求数
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// 导出 CSV
    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        writeln!(writer, "time,current_raw,current,torque_raw,torque")?;
        for s in &self.samples {
            writeln!(
                writer,
                "{},{},{},{},{}",
                s.time_s, s.current_raw, s.current, s.torque_raw, s.torque
            )?;
        }
        writer.flush()
    }
}
