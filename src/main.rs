mod config;
mod decision;
mod mixer_client;
mod overlay;
mod protocol;
mod sampler;
mod switcher;

use config::Config;
use mixer_client::VmixClient;
use std::sync::Arc;
use switcher::Switcher;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，默认 info 级别
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 加载配置
    let config = Config::new()?;
    log::info!(
        "Mixer API {}, sampling {}/s over {}s, switching every {}-{}s",
        config.api_url,
        config.samples_per_second,
        config.sample_duration_secs,
        config.switch_delay_min_secs,
        config.switch_delay_max_secs
    );

    let client = Arc::new(VmixClient::new(&config)?);
    let mut switcher = Switcher::new(config, client);

    tokio::select! {
        // 监听 Ctrl+C 信号
        _ = signal::ctrl_c() => {
            log::info!("Received Ctrl+C, shutting down...");
        }
        _ = switcher.run() => {}
    }
    Ok(())
}
