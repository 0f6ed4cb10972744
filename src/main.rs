use clap::{Arg, Command};
use rustequity::core::broker::BrokerClient;
use rustequity::core::config::ApiKeys;
use rustequity::exchanges::AlpacaBroker;
use rustequity::strategies::common::{Strategy, StrategyInstance};
use rustequity::strategies::{MeanReversionConfig, MeanReversionStrategy};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenv::dotenv().ok();

    // 解析命令行参数
    let matches = Command::new("RustEquity")
        .version("0.1")
        .about("美股均值回归交易程序")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .default_value("config/mean_reversion.yml"),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config/mean_reversion.yml");

    let config = MeanReversionConfig::from_file(config_file)?;

    // 日志级别取自策略配置，RUST_LOG 优先
    let log_level = config.strategy.log_level.to_lowercase();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level.as_str()))
        .init();

    log::info!(
        "启动策略: {} 标的: {} 配置: {} 日志级别: {}",
        config.strategy.name,
        config.symbol,
        config_file,
        log_level
    );

    let api_keys = ApiKeys::from_env(&config.broker.env_prefix)?;
    let broker = AlpacaBroker::new(&config.broker, api_keys)?;
    let client: Arc<dyn BrokerClient> = Arc::new(broker);

    let budget = config.budget;
    let mut strategy = MeanReversionStrategy::create(config)?;
    strategy.start(budget, client.clone());
    log::info!("均值回归策略已创建，开始运行...");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handle = tokio::spawn(async move { strategy.run(shutdown_rx).await });

    // 策略自行退出或收到 Ctrl-C
    let result = tokio::select! {
        joined = &mut handle => joined,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => log::info!("收到停止信号，正在关闭策略..."),
                Err(e) => log::warn!("监听停止信号失败: {}，正在关闭策略...", e),
            }
            let _ = shutdown_tx.send(true);
            handle.await
        }
    };

    // 退出前再清一次仓
    if let Err(e) = client.exit_all_positions().await {
        log::error!("退出前清仓失败: {}", e);
    } else {
        log::info!("退出前已撤销全部挂单并清空持仓");
    }

    match result {
        Ok(Ok(())) => {
            log::info!("策略正常退出");
            Ok(())
        }
        Ok(Err(e)) => {
            log::error!("策略异常退出: {}", e);
            Err(e.into())
        }
        Err(e) => Err(anyhow::anyhow!("策略任务异常结束: {}", e)),
    }
}
