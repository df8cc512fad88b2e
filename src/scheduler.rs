// File: ./src/scheduler.rs
// Daily dispatch of due events and reminders.
//
// A cycle loads the calendar, computes today's batch and sends it to every
// active subscriber, followed by the footer. Subscribers are served
// concurrently and independently: a failed or timed-out send only ends that
// subscriber's batch. A calendar or store failure skips the whole cycle; the
// periodic loop keeps running either way.
use crate::client::TelegramNotifier;
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{DeliveryError, Error, ParseError, StoreError};
use crate::model::{due_today, parse};
use crate::notifier::{LogNotifier, Notifier};
use crate::source::{CalendarSource, FileCalendarSource};
use crate::storage::FileSubscriberStore;
use crate::store::{SubscriberId, SubscriberRegistry, normalize_id};
use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strum::Display;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep, timeout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Sent after each daily batch. Empty disables it.
    pub footer_text: String,
    pub cycle_interval: Duration,
    pub subscribe_delay: Duration,
    pub send_timeout: Duration,
    pub max_concurrent_sends: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            footer_text: config.footer_text.clone(),
            cycle_interval: config.cycle_interval(),
            subscribe_delay: config.subscribe_delay(),
            send_timeout: config.send_timeout(),
            max_concurrent_sends: config.max_concurrent_sends,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Outcome of one dispatch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub date: Option<NaiveDate>,
    /// Due messages in the batch (footer not counted).
    pub messages: usize,
    pub subscribers: usize,
    /// Subscribers that received the complete batch.
    pub delivered: usize,
    /// Subscribers whose batch was cut short, sorted.
    pub failed: Vec<SubscriberId>,
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct Scheduler {
    source: Arc<dyn CalendarSource>,
    registry: Arc<dyn SubscriberRegistry>,
    notifier: Arc<dyn Notifier>,
    settings: SchedulerSettings,
    clock: Clock,
    active_cycles: AtomicUsize,
}

/// Marks a cycle as running for as long as it lives.
struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn CalendarSource>,
        registry: Arc<dyn SubscriberRegistry>,
        notifier: Arc<dyn Notifier>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            source,
            registry,
            notifier,
            settings,
            clock: Arc::new(|| Local::now().date_naive()),
            active_cycles: AtomicUsize::new(0),
        }
    }

    /// Wires the file calendar, the file store and the configured notifier.
    /// Without a bot token messages are only logged.
    pub fn from_config(ctx: &dyn AppContext, config: &Config) -> anyhow::Result<Self> {
        let calendar_path = ctx.resolve_data_path(&config.calendar_path)?;
        log::info!("Reading calendar from {}", calendar_path.display());

        let notifier: Arc<dyn Notifier> = if config.has_bot_token() {
            Arc::new(TelegramNotifier::new(&config.api_url, &config.bot_token)?)
        } else {
            log::warn!("No bot_token configured; reminders will only be logged");
            Arc::new(LogNotifier)
        };

        Ok(Self::new(
            Arc::new(FileCalendarSource::new(calendar_path)),
            Arc::new(FileSubscriberStore::open(ctx)?),
            notifier,
            SchedulerSettings::from(config),
        ))
    }

    /// Replaces the local-date clock.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn state(&self) -> SchedulerState {
        if self.active_cycles.load(Ordering::SeqCst) > 0 {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    fn enter_running(&self) -> RunningGuard<'_> {
        self.active_cycles.fetch_add(1, Ordering::SeqCst);
        RunningGuard(&self.active_cycles)
    }

    /// Loads and parses the calendar, then computes the batch for `day`.
    pub async fn batch_for(&self, day: NaiveDate) -> Result<Vec<String>, ParseError> {
        let document = self.source.load().await?;
        let events = parse(&document)?;
        Ok(due_today(&events, day))
    }

    /// Sends `messages` in order, stopping at the first failure.
    async fn deliver(&self, subscriber: &str, messages: &[String]) -> Result<(), DeliveryError> {
        for text in messages {
            match timeout(self.settings.send_timeout, self.notifier.send(subscriber, text)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(DeliveryError::Timeout {
                        subscriber: subscriber.to_string(),
                        secs: self.settings.send_timeout.as_secs(),
                    });
                }
            }
        }
        Ok(())
    }

    /// One complete dispatch to every active subscriber.
    pub async fn run_cycle(&self) -> Result<CycleReport, Error> {
        let _running = self.enter_running();
        let today = self.today();
        log::info!("Starting notification cycle for {}", today);

        let messages = self.batch_for(today).await.map_err(|e| {
            log::error!("Skipping cycle for {}: {}", today, e);
            Error::from(e)
        })?;

        let subscribers = self.registry.list_active().map_err(|e| {
            log::error!("Skipping cycle for {}: cannot list subscribers: {}", today, e);
            Error::from(e)
        })?;

        let mut outgoing = messages.clone();
        if !self.settings.footer_text.is_empty() {
            outgoing.push(self.settings.footer_text.clone());
        }

        let outgoing = &outgoing;
        let results: Vec<(SubscriberId, Result<(), DeliveryError>)> = stream::iter(subscribers)
            .map(|id| async move {
                let result = self.deliver(&id, outgoing).await;
                (id, result)
            })
            .buffer_unordered(self.settings.max_concurrent_sends.max(1))
            .collect()
            .await;

        let mut report = CycleReport {
            date: Some(today),
            messages: messages.len(),
            subscribers: results.len(),
            ..CycleReport::default()
        };
        for (id, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    log::warn!("Delivery to {} failed, rest of its batch skipped: {}", id, e);
                    report.failed.push(id);
                }
            }
        }
        report.failed.sort();

        log::info!(
            "Cycle for {} done: {} messages, {}/{} subscribers served",
            today,
            report.messages,
            report.delivered,
            report.subscribers
        );
        Ok(report)
    }

    /// Today's batch to a single subscriber, without footer.
    pub async fn dispatch_to(&self, subscriber: &str) -> Result<usize, Error> {
        let today = self.today();
        let messages = self.batch_for(today).await.inspect_err(|e| {
            log::error!("Cannot build reminders for {}: {}", subscriber, e);
        })?;
        self.deliver(subscriber, &messages).await.inspect_err(|e| {
            log::warn!("Delivery to {} failed: {}", subscriber, e);
        })?;
        log::debug!("Sent {} reminders to {}", messages.len(), subscriber);
        Ok(messages.len())
    }

    /// Runs a cycle every `cycle_interval` (at least one second), first one
    /// interval from now.
    /// Never returns; failed cycles are logged and the loop goes on.
    pub async fn run(&self) {
        let period = self.settings.cycle_interval.max(Duration::from_secs(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("Scheduler started, cycle every {:?}", period);

        loop {
            ticker.tick().await;
            // Errors were logged inside the cycle.
            let _ = self.run_cycle().await;
        }
    }

    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.run().await })
    }

    /// Registers `id` and schedules a one-shot delivery of today's batch to it.
    ///
    /// Store failures are returned to the caller. The returned handle can be
    /// aborted to cancel the pending delivery.
    pub fn on_subscribe(
        self: &Arc<Self>,
        id: &str,
    ) -> Result<JoinHandle<Result<usize, Error>>, StoreError> {
        let id = normalize_id(id)?.to_string();
        if !self.registry.add(&id)? {
            log::info!("{} is already subscribed", id);
        }

        let scheduler = Arc::clone(self);
        let delay = self.settings.subscribe_delay;
        Ok(tokio::spawn(async move {
            sleep(delay).await;
            scheduler.dispatch_to(&id).await
        }))
    }

    pub fn on_unsubscribe(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.registry.remove(id)?;
        if !removed {
            log::info!("{} was not subscribed", id.trim());
        }
        Ok(removed)
    }
}
