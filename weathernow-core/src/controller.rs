//! Request lifecycle: validate, fetch off the caller's thread, hand the result to the UI.
//!
//! The controller only ever produces [`Delivery`] messages. The UI-owning context holds the
//! matching [`Inbox`] and drains it into its [`View`]; workers never touch view state.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::{runtime::Handle, sync::mpsc, task::AbortHandle};
use tracing::{debug, info, warn};

use crate::{
    Config, FetchError,
    icon::IconLoader,
    model::{FetchRequest, IconAsset, Units, WeatherSnapshot},
    provider::{WeatherProvider, provider_from_config},
};

/// Presentation side of the pipeline. Called only from the context that drains the [`Inbox`].
pub trait View {
    fn render(&mut self, snapshot: &WeatherSnapshot, icon: Option<&IconAsset>);

    fn render_error(&mut self, error: &FetchError);
}

/// Per-submission lifecycle. Each submission walks this once; nothing carries over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Validating,
    Rejected,
    Fetching,
    Failed,
    ParsingSuccess,
    LoadingIcon,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ready {
        snapshot: WeatherSnapshot,
        icon: Option<IconAsset>,
    },
    Failed(FetchError),
}

/// One finished submission on its way to the UI context.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub request: FetchRequest,
    pub outcome: Outcome,
}

#[derive(Debug)]
pub struct FetchController {
    config: Config,
    provider: Arc<dyn WeatherProvider>,
    icons: IconLoader,
    runtime: Handle,
    latest: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<Delivery>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl FetchController {
    /// Workers are spawned on `runtime`, so `submit` may be called from any thread.
    pub fn new(config: Config, provider: Arc<dyn WeatherProvider>, runtime: Handle) -> (Self, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let latest = Arc::new(AtomicU64::new(0));

        let controller = Self {
            config,
            icons: IconLoader::new(provider.clone()),
            provider,
            runtime,
            latest: latest.clone(),
            tx,
            in_flight: Mutex::new(None),
        };

        (controller, Inbox { rx, latest })
    }

    /// Controller backed by the OpenWeatherMap provider.
    pub fn from_config(config: Config, runtime: Handle) -> Result<(Self, Inbox), FetchError> {
        let provider: Arc<dyn WeatherProvider> = provider_from_config(&config)?.into();
        Ok(Self::new(config, provider, runtime))
    }

    /// Validate and dispatch. Returns as soon as the worker is spawned.
    ///
    /// A new submission aborts the previous in-flight one; its result, if already posted,
    /// is discarded by the [`Inbox`].
    pub fn submit(&self, city: &str, units: Units) -> Result<FetchRequest, FetchError> {
        debug!(phase = ?FetchPhase::Validating, "submission received");

        if let Err(err) = self.validate(city) {
            debug!(phase = ?FetchPhase::Rejected, error = %err, "submission rejected");
            return Err(err);
        }

        // Sequence assignment, abort and spawn happen under one lock, so the worker left in
        // the slot always carries the highest sequence number.
        let mut in_flight = self.in_flight.lock();

        let request = FetchRequest {
            seq: self.latest.fetch_add(1, Ordering::SeqCst) + 1,
            city: city.trim().to_string(),
            units,
        };
        info!(seq = request.seq, city = %request.city, %units, "fetching weather");

        if let Some(previous) = in_flight.take() {
            previous.abort();
        }
        let worker = run(
            self.provider.clone(),
            self.icons.clone(),
            request.clone(),
            self.tx.clone(),
        );
        *in_flight = Some(self.runtime.spawn(worker).abort_handle());

        Ok(request)
    }

    /// Abandon whatever is in flight. Nothing submitted so far will reach the view.
    pub fn cancel(&self) {
        let mut in_flight = self.in_flight.lock();
        if let Some(previous) = in_flight.take() {
            previous.abort();
        }
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(seq, "in-flight fetch cancelled");
    }

    fn validate(&self, city: &str) -> Result<(), FetchError> {
        self.config.api_key()?;
        if city.trim().is_empty() {
            return Err(FetchError::Validation);
        }
        Ok(())
    }
}

async fn run(
    provider: Arc<dyn WeatherProvider>,
    icons: IconLoader,
    request: FetchRequest,
    tx: mpsc::UnboundedSender<Delivery>,
) {
    let seq = request.seq;
    debug!(seq, phase = ?FetchPhase::Fetching);

    let outcome = match provider.current_weather(&request).await {
        Ok(snapshot) => {
            debug!(seq, phase = ?FetchPhase::ParsingSuccess);
            debug!(seq, phase = ?FetchPhase::LoadingIcon, code = ?snapshot.icon_code);
            let icon = icons.load(snapshot.icon_code.as_deref()).await;
            debug!(seq, phase = ?FetchPhase::Done, icon = icon.is_some());
            Outcome::Ready { snapshot, icon }
        }
        Err(err) => {
            warn!(seq, phase = ?FetchPhase::Failed, error = %err, "weather fetch failed");
            Outcome::Failed(err)
        }
    };

    if tx.send(Delivery { request, outcome }).is_err() {
        debug!(seq, "inbox closed, result dropped");
    }
}

/// Receiving end of the hand-off, owned by the UI context.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Delivery>,
    latest: Arc<AtomicU64>,
}

impl Inbox {
    /// Apply everything already posted without waiting. Returns how many results were rendered.
    ///
    /// Suited to toolkits that poll once per frame.
    pub fn try_drain<V: View + ?Sized>(&mut self, view: &mut V) -> usize {
        let mut applied = 0;
        while let Ok(delivery) = self.rx.try_recv() {
            if self.apply(delivery, view).is_some() {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next current result and render it. `None` once the controller is gone.
    pub async fn next<V: View + ?Sized>(&mut self, view: &mut V) -> Option<FetchRequest> {
        loop {
            let delivery = self.rx.recv().await?;
            if let Some(request) = self.apply(delivery, view) {
                return Some(request);
            }
        }
    }

    /// Blocking variant of [`Inbox::next`] for a plain UI thread. Must not be called
    /// from inside the runtime.
    pub fn blocking_next<V: View + ?Sized>(&mut self, view: &mut V) -> Option<FetchRequest> {
        loop {
            let delivery = self.rx.blocking_recv()?;
            if let Some(request) = self.apply(delivery, view) {
                return Some(request);
            }
        }
    }

    fn apply<V: View + ?Sized>(&self, delivery: Delivery, view: &mut V) -> Option<FetchRequest> {
        let latest = self.latest.load(Ordering::SeqCst);
        if delivery.request.seq != latest {
            debug!(seq = delivery.request.seq, latest, "stale result discarded");
            return None;
        }

        match &delivery.outcome {
            Outcome::Ready { snapshot, icon } => view.render(snapshot, icon.as_ref()),
            Outcome::Failed(err) => view.render_error(err),
        }
        Some(delivery.request)
    }
}
