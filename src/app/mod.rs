use std::{net::SocketAddr, sync::Arc};

use derive_more::Deref;
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    config::{AppConfig, SubmissionConfig},
    lock::{Lock, ProcessLock},
    store::{self, TabularStore},
    Result,
};

// ###################################
// ->  Structs
// ###################################
pub struct App {
    pub app_state: AppState,
    pub listener: TcpListener,
}
impl App {
    pub fn new(app_state: AppState, listener: TcpListener) -> Self {
        App {
            app_state,
            listener,
        }
    }

    pub async fn build_from_config(config: AppConfig) -> Result<Self> {
        let store = store::build_store(&config.store_config)?;
        let lock = Arc::new(ProcessLock::new());

        let app_state = AppState::new(store, lock, config.submission_config);

        let addr = SocketAddr::from((config.net_config.host, config.net_config.app_port));
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        info!("{:<20} - {}", "Listening on:", addr);

        let app = App::new(app_state, listener);
        Ok(app)
    }
}

pub struct InternalState {
    pub store: Arc<dyn TabularStore>,
    pub lock: Arc<dyn Lock>,
    pub submission_config: SubmissionConfig,
}

/// Application state containing all global data.
/// It implements `Deref` to easily access the fields on `InternalState`
/// Uses an `Arc` so it can be cloned around.
#[derive(Clone, Deref)]
pub struct AppState(Arc<InternalState>);

impl AppState {
    pub fn new(
        store: Arc<dyn TabularStore>,
        lock: Arc<dyn Lock>,
        submission_config: SubmissionConfig,
    ) -> Self {
        AppState(Arc::new(InternalState {
            store,
            lock,
            submission_config,
        }))
    }
}
