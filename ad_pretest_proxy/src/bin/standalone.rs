use ad_pretest::NoOcr;
use ad_pretest_proxy::{start_server, ServerConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ad_pretest::init_logging();

    // Bind address and heatmap API key from env
    let cfg = ServerConfig::from_env();

    let handle = start_server(cfg, Arc::new(NoOcr)).await?;
    // Park forever
    handle.await.ok();
    Ok(())
}
