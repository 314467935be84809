//! 运行时辅助函数

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 在阻塞线程池执行驱动层调用
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("后台任务异常退出")?
}

/// 创建停止标志：Ctrl+C 或 `limit` 到期时置位
pub fn stop_flag(limit: Option<Duration>) -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 收到 Ctrl+C，停止...");
            flag.store(true, Ordering::Relaxed);
        }
    });

    if let Some(limit) = limit {
        let flag = Arc::clone(&stop);
        tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            flag.store(true, Ordering::Relaxed);
        });
    }

    stop
}

/// 当前 Unix 时间戳（秒），用于生成输出文件名
pub fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blocking_propagates_result() {
        assert_eq!(blocking(|| Ok(21 * 2)).await.unwrap(), 42);
        assert!(blocking(|| -> Result<()> { anyhow::bail!("boom") }).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_flag_expires() {
        let stop = stop_flag(Some(Duration::from_millis(10)));
        assert!(!stop.load(Ordering::Relaxed));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(stop.load(Ordering::Relaxed));
    }
}
