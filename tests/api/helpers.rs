use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde_json::Value;
use sitehooks::{
    config::SubmissionConfig,
    init_dbg_tracing,
    lock::{Lock, LockGuard, ProcessLock},
    store::{MemoryStore, Row, StoreError, StoreResult, Table, TabularStore},
    App, AppState,
};
use tokio::net::TcpListener;
use tracing::info;

/// Trying to bind port 0 will trigger an OS scan for an available port
/// which will then be bound to the application.
const TEST_SOCK_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 0);

pub const STORE_ID: &str = "S1";

fn _init_test_subscriber() {
    static SUBSCRIBER: OnceLock<()> = OnceLock::new();
    SUBSCRIBER.get_or_init(|| {
        init_dbg_tracing();
    });
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub http_client: Client,
    /// Inspectable backing store, empty when the app was spawned with another store.
    pub store: MemoryStore,
    pub sheet_name: String,
}

impl TestApp {
    /// Default submission config on top of a fresh `MemoryStore`.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_config(SubmissionConfig::default()).await
    }

    pub async fn spawn_with_config(config: SubmissionConfig) -> Result<Self> {
        let store = MemoryStore::new();
        Self::spawn_with(
            Arc::new(store.clone()),
            Arc::new(ProcessLock::new()),
            config,
            store,
        )
        .await
    }

    pub async fn spawn_with_lock(lock: Arc<dyn Lock>, config: SubmissionConfig) -> Result<Self> {
        let store = MemoryStore::new();
        Self::spawn_with(Arc::new(store.clone()), lock, config, store).await
    }

    pub async fn spawn_with_store(store: Arc<dyn TabularStore>) -> Result<Self> {
        Self::spawn_with(
            store,
            Arc::new(ProcessLock::new()),
            SubmissionConfig::default(),
            MemoryStore::new(),
        )
        .await
    }

    /// `inspect` is the store `stored_rows` reads, pass a clone of the served `MemoryStore`.
    pub async fn spawn_with(
        store: Arc<dyn TabularStore>,
        lock: Arc<dyn Lock>,
        config: SubmissionConfig,
        inspect: MemoryStore,
    ) -> Result<Self> {
        // _init_test_subscriber();

        let sheet_name = config.sheet_name.clone();
        let app_state = AppState::new(store, lock, config);

        let listener = TcpListener::bind(TEST_SOCK_ADDR).await?;
        let addr = listener.local_addr()?;
        info!("Listening on {addr}");

        tokio::spawn(sitehooks::web::serve(App::new(app_state, listener)));

        let http_client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(TestApp {
            addr,
            http_client,
            store: inspect,
            sheet_name,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn post_submission(&self, body: &Value) -> Result<Response> {
        let res = self.http_client.post(self.url("/")).json(body).send().await?;
        Ok(res)
    }

    pub async fn post_raw(&self, content_type: Option<&str>, body: &'static str) -> Result<Response> {
        let mut req = self.http_client.post(self.url("/")).body(body);
        if let Some(content_type) = content_type {
            req = req.header(header::CONTENT_TYPE, content_type);
        }
        Ok(req.send().await?)
    }

    /// Every row of the newsletter sheet of `STORE_ID`, header included.
    pub fn stored_rows(&self) -> Result<Vec<Row>> {
        let rows = self.store.rows(STORE_ID, &self.sheet_name)?;
        Ok(rows.unwrap_or_default())
    }
}

/// A lock that is always held by someone else.
pub struct NeverLock;

#[async_trait]
impl Lock for NeverLock {
    async fn try_acquire(&self, _timeout: Duration) -> Option<LockGuard> {
        None
    }
}

/// A store whose backend is down.
pub struct FailingStore;

#[async_trait]
impl TabularStore for FailingStore {
    async fn open(&self, _store_id: &str, _sheet_name: &str) -> StoreResult<Box<dyn Table>> {
        Err(StoreError::Remote {
            status: 503,
            body: "backend unavailable".to_string(),
        })
    }
}

/// Fails the first `open`, then serves from the wrapped `MemoryStore`.
pub struct FlakyStore {
    inner: MemoryStore,
    failed_once: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failed_once: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TabularStore for FlakyStore {
    async fn open(&self, store_id: &str, sheet_name: &str) -> StoreResult<Box<dyn Table>> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Remote {
                status: 503,
                body: "backend warming up".to_string(),
            });
        }
        self.inner.open(store_id, sheet_name).await
    }
}
