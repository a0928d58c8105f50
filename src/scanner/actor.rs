use std::collections::HashMap;

use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::{ActorStopReason, BoxError};
use kameo::message::{Context, Message};
use kameo::request::MessageSend;
use kameo::{mailbox::unbounded::UnboundedMailbox, Actor, Reply};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::api::binance::klines::BinanceKlinesClient;
use crate::api::types::{ApiError, ApiRequest};
use crate::candles::structs::FuturesOHLCVCandle;
use crate::scanner::structs::{
    ScannerConfig, ScannerState, ScannerStatus, SignalRecord, ANALYSIS_MIN_STREAMED_BARS,
    HISTORICAL_FETCH_LIMIT,
};
use crate::signal::engine::SignalEngine;
use crate::universe::SymbolUniverse;
use crate::websocket::binance::kline::parse_any_kline_message;
use crate::websocket::connection::ConnectionManager;
use crate::websocket::types::{normalize_symbols, StreamSubscription};

/// Scanner actor messages for telling (fire-and-forget)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScannerTell {
    /// Apply a streamed candle tick (sent by the subscription task)
    ProcessCandle {
        symbol: String,
        candle: FuturesOHLCVCandle,
    },
    /// Finish an analysis cycle with a fetched historical window
    /// (empty on fetch failure; sent by a detached fetch task)
    CompleteAnalysis {
        symbol: String,
        historical: Vec<FuturesOHLCVCandle>,
    },
    /// Advance to the next subscription batch (sent by the rotation timer)
    RotateBatch,
}

/// Scanner actor messages for asking (request-response)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScannerAsk {
    /// Begin scanning from batch 0
    Start,
    /// Stop scanning and discard transient state
    Stop,
    /// Get the scanner status snapshot
    GetStatus,
    /// Get the signals inside the validity window
    GetActiveSignals,
    /// Get the symbols of the currently live batch
    GetActiveSymbols,
}

/// Scanner actor replies
#[derive(Debug, Clone, Serialize, Deserialize, Reply)]
pub enum ScannerReply {
    /// Scanning started
    Started,
    /// Scanning stopped
    Stopped,
    /// The lifecycle call was redundant; state is unchanged
    NoOp(String),
    /// Status snapshot
    Status(ScannerStatus),
    /// Active signals by symbol
    ActiveSignals(HashMap<String, SignalRecord>),
    /// Currently subscribed symbols
    ActiveSymbols(Vec<String>),
}

/// Batch-rotation scanner actor.
///
/// Owns the scanner state exclusively: streamed ticks, the rotation timer
/// and completed historical fetches all funnel through this mailbox, so no
/// mutation races another. Network calls never run inside a handler — the
/// subscription and historical fetches live in detached tasks that report
/// back as messages.
pub struct ScannerActor {
    config: ScannerConfig,
    state: ScannerState,
    engine: SignalEngine,
    klines_client: BinanceKlinesClient,
    connection_task: Option<tokio::task::JoinHandle<()>>,
    rotation_task: Option<tokio::task::JoinHandle<()>>,
}

impl ScannerActor {
    pub fn new(config: ScannerConfig, universe: SymbolUniverse) -> Result<Self, ApiError> {
        let klines_client = BinanceKlinesClient::new(config.rest_base_url.clone())?;
        let engine = SignalEngine::new(config.timeframe_seconds);

        Ok(Self {
            config,
            state: ScannerState::new(universe),
            engine,
            klines_client,
            connection_task: None,
            rotation_task: None,
        })
    }

    /// Open the kline stream for the currently live batch, replacing any
    /// previous subscription.
    fn open_batch_connection(&mut self, actor_ref: ActorRef<Self>) {
        if let Some(handle) = self.connection_task.take() {
            handle.abort();
        }

        let symbols = self.state.active_symbols().to_vec();
        if symbols.is_empty() {
            warn!("Current batch is empty, nothing to subscribe");
            return;
        }

        let normalized = match normalize_symbols(&symbols) {
            Ok(symbols) => symbols,
            Err(e) => {
                error!("Failed to normalize batch symbols: {}", e);
                return;
            }
        };

        let subscription = StreamSubscription::new(normalized, self.config.interval.clone());
        let mut connection = ConnectionManager::new(self.config.ws_base_url.clone());
        let url = match connection.build_multi_stream_url(&subscription) {
            Ok(url) => url,
            Err(e) => {
                error!("Failed to build stream URL: {}", e);
                return;
            }
        };

        info!(
            "📡 Subscribing batch {}/{}: {} symbols",
            self.state.current_batch() + 1,
            self.state.batch_count(),
            subscription.symbols.len()
        );

        let actor_ref_for_connection = actor_ref.clone();
        let handle = tokio::spawn(async move {
            let message_handler = |message: String| {
                let actor_ref = actor_ref_for_connection.clone();
                async move {
                    let event = parse_any_kline_message(&message)?;
                    let candle = event.kline.to_futures_candle()?;

                    let process_msg = ScannerTell::ProcessCandle {
                        symbol: event.symbol,
                        candle,
                    };
                    if let Err(e) = actor_ref.tell(process_msg).send().await {
                        warn!("Failed to send candle to scanner: {}", e);
                    }

                    Ok(())
                }
            };

            if let Err(e) = connection.connect_with_retry(&url, message_handler).await {
                error!("Batch subscription failed permanently: {}", e);
            }
        });

        self.connection_task = Some(handle);
    }

    /// Drive batch rotation on a fixed cadence while scanning.
    fn spawn_rotation_timer(&mut self, actor_ref: ActorRef<Self>) {
        if let Some(handle) = self.rotation_task.take() {
            handle.abort();
        }

        let rotation_interval = self.config.rotation_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(rotation_interval);
            ticker.tick().await; // the first tick completes immediately
            loop {
                ticker.tick().await;
                if actor_ref.tell(ScannerTell::RotateBatch).send().await.is_err() {
                    break;
                }
            }
        });

        self.rotation_task = Some(handle);
    }

    fn shutdown_streams(&mut self) {
        if let Some(handle) = self.rotation_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.connection_task.take() {
            handle.abort();
        }
    }

    /// Kick off the historical fetch for a symbol whose streamed series is
    /// deep enough to analyze. Runs detached so the mailbox keeps draining;
    /// the result comes back as `CompleteAnalysis`.
    fn spawn_analysis_fetch(&self, symbol: String, actor_ref: ActorRef<Self>) {
        let client = self.klines_client.clone();
        let interval = self.config.interval.clone();

        tokio::spawn(async move {
            let request = ApiRequest::new_klines(symbol.clone(), interval)
                .with_limit(HISTORICAL_FETCH_LIMIT);

            let historical = match client.fetch_klines(&request).await {
                Ok(candles) => candles,
                Err(e) => {
                    warn!(
                        "Historical fetch failed for {}: {}. Analyzing streamed data only",
                        symbol, e
                    );
                    Vec::new()
                }
            };

            let msg = ScannerTell::CompleteAnalysis { symbol, historical };
            if let Err(e) = actor_ref.tell(msg).send().await {
                warn!("Failed to send analysis completion to scanner: {}", e);
            }
        });
    }
}

impl Actor for ScannerActor {
    type Mailbox = UnboundedMailbox<Self>;

    fn name() -> &'static str {
        "ScannerActor"
    }

    async fn on_start(&mut self, _actor_ref: ActorRef<Self>) -> Result<(), BoxError> {
        info!(
            "🚀 Scanner actor ready: {} symbols in {} batches of {} ({} timeframe)",
            self.state.universe().total_symbols(),
            self.state.batch_count(),
            self.config.batch_size,
            self.config.interval
        );
        Ok(())
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        _reason: ActorStopReason,
    ) -> Result<(), BoxError> {
        info!("🛑 Scanner actor stopping");
        self.shutdown_streams();
        Ok(())
    }
}

impl Message<ScannerTell> for ScannerActor {
    type Reply = ();

    async fn handle(&mut self, msg: ScannerTell, ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        match msg {
            ScannerTell::ProcessCandle { symbol, candle } => {
                if !self.state.scanning() {
                    debug!("Dropping tick for {} while idle", symbol);
                    return;
                }

                self.state.apply_tick(&symbol, candle);

                if self.state.series_len(&symbol) >= ANALYSIS_MIN_STREAMED_BARS {
                    self.spawn_analysis_fetch(symbol, ctx.actor_ref().clone());
                }
            }
            ScannerTell::CompleteAnalysis { symbol, historical } => {
                // Stale-result guard: a fetch that was in flight across a
                // stop must not resurrect state.
                if !self.state.scanning() {
                    debug!("Discarding stale analysis for {}", symbol);
                    return;
                }

                let merged = self.state.merged_series(&symbol, &historical);
                let verdict = self.engine.evaluate(&merged);
                let now = chrono::Utc::now().timestamp_millis();

                self.state.commit_verdict(&symbol, &verdict, now);
                if let Some(record) = self.state.signal(&symbol) {
                    info!(
                        "🎯 {}: {} | price: {:.4} | RSI: {:.1} | trend: {}",
                        symbol,
                        record.kinds(),
                        record.price,
                        record.rsi,
                        record.trend
                    );
                }
            }
            ScannerTell::RotateBatch => {
                if !self.state.scanning() {
                    return;
                }

                self.state.advance_batch();
                info!(
                    "🔄 Rotating to batch {}/{}",
                    self.state.current_batch() + 1,
                    self.state.batch_count()
                );
                self.open_batch_connection(ctx.actor_ref().clone());
            }
        }
    }
}

impl Message<ScannerAsk> for ScannerActor {
    type Reply = ScannerReply;

    async fn handle(&mut self, msg: ScannerAsk, ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        match msg {
            ScannerAsk::Start => {
                if !self.state.start() {
                    warn!("Start requested but scanner is already running");
                    return ScannerReply::NoOp("scanner already running".to_string());
                }

                info!(
                    "🚀 Starting scan: {} timeframe, batches of {}",
                    self.config.interval, self.config.batch_size
                );
                let actor_ref = ctx.actor_ref().clone();
                self.open_batch_connection(actor_ref.clone());
                self.spawn_rotation_timer(actor_ref);
                ScannerReply::Started
            }
            ScannerAsk::Stop => {
                if !self.state.scanning() {
                    return ScannerReply::NoOp("scanner not running".to_string());
                }

                self.shutdown_streams();
                self.state.stop();
                info!("🛑 Scanning stopped");
                ScannerReply::Stopped
            }
            ScannerAsk::GetStatus => {
                let now = chrono::Utc::now().timestamp_millis();
                ScannerReply::Status(self.state.status(now, &self.config.interval))
            }
            ScannerAsk::GetActiveSignals => {
                let now = chrono::Utc::now().timestamp_millis();
                ScannerReply::ActiveSignals(self.state.active_signals(now))
            }
            ScannerAsk::GetActiveSymbols => {
                ScannerReply::ActiveSymbols(self.state.active_symbols().to_vec())
            }
        }
    }
}
