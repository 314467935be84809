//! 命令定义和实现

pub mod config;
pub mod jog;
pub mod listen;
pub mod motor;
pub mod send;
pub mod stress;
pub mod torque;
pub mod zero;

pub use config::{CliConfig, ConfigCommand};
pub use jog::JogCommand;
pub use listen::ListenCommand;
pub use motor::{HoldCommand, MotorAction, SimpleCommand, TurnCommand};
pub use send::SendCommand;
pub use stress::StressCommand;
pub use torque::TorqueCommand;
pub use zero::ZeroCommand;
