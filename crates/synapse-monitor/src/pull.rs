use crate::error::{MonitorError, PullError};
use crate::store::{HistoryEntry, SnapshotStore, StatusSnapshot, StoreObserver};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use synapse_core::dashboard_api::{
    HistoryResponse, PositionRecord, PositionsResponse, StatusResponse, HISTORY_PATH,
    POSITIONS_PATH, STATUS_PATH,
};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(base: Url, request_timeout: Duration) -> Result<Self, MonitorError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("synapse-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base,
            request_timeout,
        })
    }

    pub async fn fetch_status(&self) -> Result<StatusSnapshot, PullError> {
        let response: StatusResponse = self.get_json(STATUS_PATH).await?;
        Ok(StatusSnapshot {
            online: response.is_online(),
            market_trend: response.trend_label(),
            detail: response.message.clone(),
        })
    }

    pub async fn fetch_positions(&self) -> Result<Vec<PositionRecord>, PullError> {
        let response: PositionsResponse = self.get_json(POSITIONS_PATH).await?;
        if let Some(message) = response.error {
            return Err(PullError::Server {
                path: POSITIONS_PATH,
                message,
            });
        }
        Ok(response.positions)
    }

    pub async fn fetch_history(&self) -> Result<Vec<HistoryEntry>, PullError> {
        let response: HistoryResponse = self.get_json(HISTORY_PATH).await?;
        if let Some(message) = response.error {
            return Err(PullError::Server {
                path: HISTORY_PATH,
                message,
            });
        }
        Ok(response.history.into_iter().map(HistoryEntry::from).collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str) -> Result<T, PullError> {
        let mut url = self.base.clone();
        url.set_path(path);
        match timeout(self.request_timeout, self.send_get(url, path)).await {
            Ok(result) => result,
            Err(_) => Err(PullError::Timeout {
                path,
                timeout_ms: self.request_timeout.as_millis() as u64,
            }),
        }
    }

    async fn send_get<T: DeserializeOwned>(
        &self,
        url: Url,
        path: &'static str,
    ) -> Result<T, PullError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| PullError::Transport { path, source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(PullError::Status {
                path,
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| PullError::Transport { path, source })?;
        serde_json::from_slice(&body).map_err(|source| PullError::Decode { path, source })
    }
}

/// Results of one pull cycle. The three reads are independent; each
/// result is applied on its own.
#[derive(Debug)]
pub struct PullCycle {
    pub status: Result<StatusSnapshot, PullError>,
    pub positions: Result<Vec<PositionRecord>, PullError>,
    pub history: Result<Vec<HistoryEntry>, PullError>,
}

impl PullCycle {
    pub fn failures(&self) -> usize {
        [
            self.status.is_err(),
            self.positions.is_err(),
            self.history.is_err(),
        ]
        .iter()
        .filter(|failed| **failed)
        .count()
    }
}

pub async fn run_cycle(client: &ApiClient) -> PullCycle {
    let (status, positions, history) = tokio::join!(
        client.fetch_status(),
        client.fetch_positions(),
        client.fetch_history()
    );
    PullCycle {
        status,
        positions,
        history,
    }
}

pub fn apply_cycle<O: StoreObserver>(store: &mut SnapshotStore<O>, cycle: PullCycle) {
    match cycle.status {
        Ok(status) => store.replace_status(status),
        Err(err) => {
            warn!(event = "pull_status_error", error = %err);
            store.replace_status(StatusSnapshot::failed(err.to_string()));
        }
    }
    match cycle.positions {
        Ok(records) => {
            debug!(event = "pull_positions", count = records.len());
            store.replace_positions(records);
        }
        Err(err) => warn!(event = "pull_positions_error", error = %err),
    }
    match cycle.history {
        Ok(entries) => {
            debug!(event = "pull_history", count = entries.len());
            store.replace_history(entries);
        }
        Err(err) => warn!(event = "pull_history_error", error = %err),
    }
}

pub struct PullChannel {
    client: ApiClient,
    interval: Duration,
    tx: mpsc::Sender<PullCycle>,
    refresh: Arc<Notify>,
}

impl PullChannel {
    pub fn new(client: ApiClient, interval: Duration, tx: mpsc::Sender<PullCycle>) -> Self {
        Self {
            client,
            interval,
            tx,
            refresh: Arc::new(Notify::new()),
        }
    }

    /// Handle that triggers an immediate cycle when notified.
    pub fn refresh_handle(&self) -> Arc<Notify> {
        self.refresh.clone()
    }

    /// First cycle runs at once; later cycles start one interval after the
    /// previous start. Stops when the cycle receiver is dropped.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let refreshed = tokio::select! {
                _ = ticker.tick() => false,
                _ = self.refresh.notified() => true,
            };
            if refreshed {
                ticker.reset();
            }
            let cycle = run_cycle(&self.client).await;
            if self.tx.send(cycle).await.is_err() {
                return;
            }
        }
    }
}
