//! 实时信号滤波
//!
//! 逐样本更新的滤波器，用于电流/力矩监测：
//!
//! - Savitzky-Golay：窗口内最小二乘多项式拟合，取最新样本处的拟合值
//! - EMA：`y = α·x + (1-α)·y`
//! - 一阶 IIR：`y = p·y + (1-p)·x`
//!
//! EMA 与 IIR 的初始状态均为 0。

use crate::DriverError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// 滤波器类型
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum FilterKind {
    /// Savitzky-Golay（窗口长度、多项式阶数）
    SavitzkyGolay { window: usize, order: usize },
    /// 指数移动平均
    Ema { alpha: f64 },
    /// 一阶 IIR（极点）
    Iir { pole: f64 },
    /// 不滤波
    None,
}

impl Default for FilterKind {
    fn default() -> Self {
        FilterKind::SavitzkyGolay {
            window: 11,
            order: 3,
        }
    }
}

impl FilterKind {
    pub const DEFAULT_EMA: FilterKind = FilterKind::Ema { alpha: 0.2 };
    pub const DEFAULT_IIR: FilterKind = FilterKind::Iir { pole: 0.8 };
}

#[derive(Debug, Clone)]
enum State {
    SavitzkyGolay {
        weights: Vec<f64>,
        buffer: VecDeque<f64>,
    },
    Smoothing {
        /// 新样本的权重
        gain: f64,
        last: f64,
    },
    Passthrough,
}

/// 有状态的逐样本滤波器
#[derive(Debug, Clone)]
pub struct SignalFilter {
    kind: FilterKind,
    state: State,
}

impl SignalFilter {
    /// 创建滤波器
    ///
    /// # 错误
    /// - `DriverError::InvalidInput`: 窗口为 0、阶数不小于窗口，或系数不在 [0, 1]
    pub fn new(kind: FilterKind) -> Result<Self, DriverError> {
        let state = match kind {
            FilterKind::SavitzkyGolay { window, order } => State::SavitzkyGolay {
                weights: savgol_weights(window, order)?,
                buffer: VecDeque::with_capacity(window),
            },
            FilterKind::Ema { alpha } => State::Smoothing {
                gain: unit_interval("alpha", alpha)?,
                last: 0.0,
            },
            FilterKind::Iir { pole } => State::Smoothing {
                gain: 1.0 - unit_interval("pole", pole)?,
                last: 0.0,
            },
            FilterKind::None => State::Passthrough,
        };
        Ok(Self { kind, state })
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// 输入新样本，返回滤波结果
    pub fn update(&mut self, value: f64) -> f64 {
        match &mut self.state {
            State::SavitzkyGolay { weights, buffer } => {
                if buffer.len() == weights.len() {
                    buffer.pop_front();
                }
                buffer.push_back(value);
                // 窗口未满时直接返回原始值
                if buffer.len() < weights.len() {
                    return value;
                }
                weights.iter().zip(buffer.iter()).map(|(w, x)| w * x).sum()
            },
            State::Smoothing { gain, last } => {
                *last = *gain * value + (1.0 - *gain) * *last;
                *last
            },
            State::Passthrough => value,
        }
    }

    /// 清空内部状态
    pub fn reset(&mut self) {
        match &mut self.state {
            State::SavitzkyGolay { buffer, .. } => buffer.clear(),
            State::Smoothing { last, .. } => *last = 0.0,
            State::Passthrough => {},
        }
    }
}

fn unit_interval(name: &str, value: f64) -> Result<f64, DriverError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DriverError::InvalidInput(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

/// 计算窗口末端的 Savitzky-Golay 权重
///
/// 对窗口内 `x = -(w-1)/2 ..= (w-1)/2` 拟合 `order` 阶多项式，权重为
/// `vᵀ (AᵀA)⁻¹ Aᵀ`，其中 `A` 为 Vandermonde 矩阵，`v` 为最后一行。
pub fn savgol_weights(window: usize, order: usize) -> Result<Vec<f64>, DriverError> {
    if window == 0 || order >= window {
        return Err(DriverError::InvalidInput(format!(
            "Savitzky-Golay requires 0 <= order < window, got window={window}, order={order}"
        )));
    }

    let half = (window as f64 - 1.0) / 2.0;
    let a = DMatrix::from_fn(window, order + 1, |row, col| {
        (row as f64 - half).powi(col as i32)
    });

    let normal = a.transpose() * &a;
    let inverse = normal.try_inverse().ok_or_else(|| {
        DriverError::InvalidInput(format!(
            "Savitzky-Golay normal matrix is singular (window={window}, order={order})"
        ))
    })?;

    let last: DVector<f64> = a.row(window - 1).transpose();
    let weights = a * (inverse * last);
    Ok(weights.iter().copied().collect())
}
