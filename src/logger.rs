use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// 安装全局日志订阅器。
///
/// `RUST_LOG` 优先；未设置或无法解析时使用配置中的默认级别。
pub fn init_logger(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(default_directive).unwrap_or_else(|e| {
            eprintln!("无效的日志级别 '{default_directive}': {e}，改用 info。");
            EnvFilter::new("info")
        })
    });

    if let Err(e) = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
    {
        eprintln!("日志系统初始化失败: {e}");
    }
}
