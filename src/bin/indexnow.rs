//! Post-build step: `BUILD_ROOT=dist INDEXNOW_KEY=... indexnow`.
//! Always exits successfully so a failed notification never breaks the build.

use sitehooks::indexnow::{self, IndexNowConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    sitehooks::init_production_tracing();

    let config = match IndexNowConfig::from_env() {
        Ok(config) => config,
        Err(er) => {
            error!("[IndexNow] Could not read the configuration: {er}");
            return;
        }
    };

    let outcome = indexnow::run(&config).await;
    info!("[IndexNow] Done: {outcome:?}");
}
