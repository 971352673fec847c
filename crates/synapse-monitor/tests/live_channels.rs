use axum::{
    extract::ws::{Message, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use clap::Parser;
use serde_json::json;
use std::time::Duration;
use synapse_core::dashboard_api::{HISTORY_PATH, POSITIONS_PATH, STATUS_PATH};
use synapse_core::PnlValue;
use synapse_monitor::app::App;
use synapse_monitor::config::{Args, Config};
use synapse_monitor::error::PullError;
use synapse_monitor::pull::{run_cycle, ApiClient, PullChannel};
use synapse_monitor::push::{stream_url, ChannelState, PushChannel, PushEvent};
use synapse_monitor::view::UNKNOWN_TEXT;
use tokio::sync::mpsc;
use tokio::time::timeout;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);

async fn status_ok() -> impl IntoResponse {
    Json(json!({"service": "synapse-trader-api", "status": "online", "market_trend": "BULLISH"}))
}

async fn positions_ok() -> impl IntoResponse {
    Json(json!({"positions": [
        {"symbol": "BTC", "side": "BUY", "quantity": 0.5, "entry_price": 60000.0, "sl_price": 58000.0},
        {"symbol": "ETH", "side": "SELL", "quantity": 2.0, "entry_price": 3000.0, "sl_price": 3100.0,
         "tp_price": 2800.0, "strategy": "ema_crossover"}
    ]}))
}

async fn history_ok() -> impl IntoResponse {
    Json(json!({"history": [
        {"timestamp_exit": "2024-03-01T10:00:00", "symbol": "SOL", "side": "BUY",
         "pnl": 3.2, "pnl_percent": 1.5}
    ]}))
}

async fn dashboard_stream(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|mut socket| async move {
        let _ = socket.send(Message::Text("not a frame".to_string())).await;
        let _ = socket
            .send(Message::Text(r#"{"symbol":"BTC","pnl":12.5,"price":61000.0}"#.to_string()))
            .await;
        let _ = socket.send(Message::Close(None)).await;
    })
}

async fn serve(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Url::parse(&format!("http://{addr}")).expect("url")
}

fn healthy_router() -> Router {
    Router::new()
        .route(STATUS_PATH, get(status_ok))
        .route(POSITIONS_PATH, get(positions_ok))
        .route(HISTORY_PATH, get(history_ok))
        .route("/ws/dashboard", get(dashboard_stream))
}

async fn next_event(rx: &mut mpsc::Receiver<PushEvent>) -> PushEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("event in time")
        .expect("channel open")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pull_cycle_fills_the_dashboard() {
    let base = serve(healthy_router()).await;
    let client = ApiClient::new(base, Duration::from_secs(2)).expect("client");

    let cycle = run_cycle(&client).await;
    assert_eq!(cycle.failures(), 0);

    let mut app = App::new("test");
    app.apply_pull_cycle(cycle);
    let view = app.view();
    assert!(view.status().online);
    assert_eq!(view.status().trend, "BULLISH");
    assert_eq!(view.positions().len(), 2);
    assert_eq!(view.positions()[0].symbol, "BTC");
    assert_eq!(view.positions()[0].entry_price, "60000.0000");
    assert_eq!(view.positions()[0].pnl.text, UNKNOWN_TEXT);
    assert_eq!(view.history().len(), 1);
    assert_eq!(view.history()[0].pnl_display(), "$3.20 (1.50%)");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_endpoints_stay_isolated() {
    let router = Router::new()
        .route(STATUS_PATH, get(status_ok))
        .route(
            POSITIONS_PATH,
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(HISTORY_PATH, get(|| async { "not json" }));
    let base = serve(router).await;
    let client = ApiClient::new(base, Duration::from_secs(2)).expect("client");

    let cycle = run_cycle(&client).await;
    assert!(cycle.status.is_ok());
    assert!(matches!(
        cycle.positions,
        Err(PullError::Status { status: 500, .. })
    ));
    assert!(matches!(cycle.history, Err(PullError::Decode { .. })));
    assert_eq!(cycle.failures(), 2);

    let mut app = App::new("test");
    app.apply_pull_cycle(cycle);
    assert!(app.view().status().online);
    assert!(app.view().positions().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_error_envelopes_and_slow_endpoints_fail() {
    let router = Router::new()
        .route(
            STATUS_PATH,
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"status": "online", "market_trend": "BEARISH"}))
            }),
        )
        .route(
            POSITIONS_PATH,
            get(|| async { Json(json!({"positions": [], "error": "db locked"})) }),
        )
        .route(HISTORY_PATH, get(history_ok));
    let base = serve(router).await;
    let client = ApiClient::new(base, Duration::from_millis(200)).expect("client");

    let cycle = run_cycle(&client).await;
    assert!(matches!(cycle.status, Err(PullError::Timeout { .. })));
    match &cycle.positions {
        Err(PullError::Server { message, .. }) => assert_eq!(message, "db locked"),
        other => panic!("unexpected positions result: {other:?}"),
    }
    assert!(cycle.history.is_ok());

    let mut app = App::new("test");
    app.apply_pull_cycle(cycle);
    assert!(!app.view().status().online);
    assert_eq!(app.view().status().trend, "API ERROR");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn push_channel_reports_frames_and_reconnects() {
    let base = serve(healthy_router()).await;
    let (tx, mut rx) = mpsc::channel(16);
    let handle = PushChannel::new(
        stream_url(&base).expect("stream url"),
        Duration::from_millis(50),
        tx,
    )
    .start();

    assert_eq!(next_event(&mut rx).await, PushEvent::State(ChannelState::Connecting));
    assert_eq!(next_event(&mut rx).await, PushEvent::State(ChannelState::Open));
    match next_event(&mut rx).await {
        PushEvent::Frame(frame) => {
            assert_eq!(frame.symbol, "BTC");
            assert_eq!(frame.pnl, PnlValue::Known(12.5));
            assert_eq!(frame.price, Some(61000.0));
        }
        other => panic!("expected frame, got {other:?}"),
    }
    assert_eq!(
        next_event(&mut rx).await,
        PushEvent::State(ChannelState::ClosedPendingReconnect)
    );
    assert_eq!(next_event(&mut rx).await, PushEvent::State(ChannelState::Connecting));
    assert_eq!(next_event(&mut rx).await, PushEvent::State(ChannelState::Open));

    drop(rx);
    let _ = timeout(WAIT, handle).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn push_channel_retries_when_server_is_absent() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let url = Url::parse(&format!("ws://{addr}/ws/dashboard")).expect("url");

    let (tx, mut rx) = mpsc::channel(16);
    let handle = PushChannel::new(url, Duration::from_millis(20), tx).start();
    for _ in 0..2 {
        assert_eq!(next_event(&mut rx).await, PushEvent::State(ChannelState::Connecting));
        assert_eq!(
            next_event(&mut rx).await,
            PushEvent::State(ChannelState::ClosedPendingReconnect)
        );
    }
    handle.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pull_channel_runs_at_once_and_on_refresh() {
    let base = serve(healthy_router()).await;
    let client = ApiClient::new(base, Duration::from_secs(2)).expect("client");
    let (tx, mut rx) = mpsc::channel(4);
    let channel = PullChannel::new(client, Duration::from_secs(600), tx);
    let refresh = channel.refresh_handle();
    let handle = channel.start();

    let first = timeout(WAIT, rx.recv()).await.expect("first").expect("open");
    assert_eq!(first.failures(), 0);

    refresh.notify_one();
    let second = timeout(WAIT, rx.recv()).await.expect("refresh").expect("open");
    assert_eq!(second.failures(), 0);
    handle.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pull_cadence_is_measured_from_cycle_start() {
    const LATENCY: Duration = Duration::from_millis(250);
    const INTERVAL: Duration = Duration::from_millis(400);

    async fn slow<F: std::future::Future>(body: F) -> F::Output {
        tokio::time::sleep(LATENCY).await;
        body.await
    }

    let router = Router::new()
        .route(STATUS_PATH, get(|| slow(status_ok())))
        .route(POSITIONS_PATH, get(|| slow(positions_ok())))
        .route(HISTORY_PATH, get(|| slow(history_ok())));
    let base = serve(router).await;
    let client = ApiClient::new(base, Duration::from_secs(2)).expect("client");
    let (tx, mut rx) = mpsc::channel(4);
    let handle = PullChannel::new(client, INTERVAL, tx).start();

    let mut arrivals = Vec::new();
    for _ in 0..3 {
        let cycle = timeout(WAIT, rx.recv()).await.expect("cycle").expect("open");
        assert_eq!(cycle.failures(), 0);
        arrivals.push(tokio::time::Instant::now());
    }
    handle.abort();

    // Start-to-start spacing gives two intervals between the first and third
    // cycle; end-to-start spacing would add one request latency per gap.
    let span = arrivals[2] - arrivals[0];
    assert!(span >= INTERVAL * 2 - Duration::from_millis(100), "{span:?}");
    assert!(span < INTERVAL * 2 + LATENCY, "{span:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stream_scheme_server_url_still_pulls() {
    let base = serve(healthy_router()).await;
    let ws_base = format!("ws://{}:{}", base.host_str().expect("host"), base.port().expect("port"));
    let config = Config::from_args(Args::parse_from(["synapse-monitor", "--server-url", &ws_base]))
        .expect("config");
    let client = ApiClient::new(config.server_url.clone(), config.request_timeout).expect("client");

    let cycle = run_cycle(&client).await;
    assert_eq!(cycle.failures(), 0);
    assert_eq!(
        stream_url(&config.server_url).expect("stream url").scheme(),
        "ws"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn live_pnl_reaches_the_row_and_clears_on_close() {
    let base = serve(healthy_router()).await;
    let client = ApiClient::new(base.clone(), Duration::from_secs(2)).expect("client");
    let mut app = App::new(base.as_str());
    app.apply_pull_cycle(run_cycle(&client).await);

    let (tx, mut rx) = mpsc::channel(16);
    let handle = PushChannel::new(
        stream_url(&base).expect("stream url"),
        Duration::from_secs(60),
        tx,
    )
    .start();

    let mut saw_live = false;
    loop {
        let event = next_event(&mut rx).await;
        let closed = event == PushEvent::State(ChannelState::ClosedPendingReconnect);
        app.apply_push_event(event);
        if let Some(row) = app.view().position_row("BTC") {
            if row.pnl.text == "$12.50" {
                assert_eq!(row.mark_price, "61000.0000");
                saw_live = true;
            }
        }
        if closed {
            break;
        }
    }
    assert!(saw_live);
    let btc = app.view().position_row("BTC").expect("btc row");
    assert_eq!(btc.pnl.text, UNKNOWN_TEXT);
    assert_eq!(btc.pnl.class, None);
    handle.abort();
}
