//! 运行模式
//!
//! 子命令每次独立连接；`shell` 进入交互式 Shell，会话期间保持连接。

pub mod repl;
