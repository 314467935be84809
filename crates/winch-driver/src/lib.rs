//! 驱动层模块
//!
//! 本模块提供绞盘电机的请求/应答驱动，包括：
//! - 阻塞式客户端 [`Winch`]（按操作码 + 子码匹配应答）
//! - 点动序列 [`jog`]
//! - 力矩监测与实时滤波 [`TorqueMonitor`]
//! - 应答延迟压力测试 [`run_stress`]
//!
//! 驱动层单线程运行，独占适配器；并发（后台监听、Ctrl-C）由应用层处理。

mod error;
pub mod filter;
pub mod jog;
pub mod stress;
pub mod torque;
mod winch;

pub use error::DriverError;
pub use filter::{FilterKind, SignalFilter};
pub use jog::{Direction, JogConfig, JogOutcome, jog};
pub use stress::{LatencyReport, StressConfig, percentile, run_stress};
pub use torque::{DEFAULT_TORQUE_CONSTANT, TorqueMonitor, TorqueMonitorConfig, TorqueSample};
pub use winch::{Winch, WinchConfig};
