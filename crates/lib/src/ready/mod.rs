//! Deferring work until a renderer's style has finished loading.
//!
//! Mutating a renderer while it is still swapping styles loses the mutation,
//! so every incremental change goes through [`schedule_ready`]. The scheduler
//! listens for the renderer's lifecycle events and polls `is_style_loaded` on
//! a bounded timer in parallel; whichever confirms readiness first wins. If
//! the poll budget runs out the callback fires anyway.
//!
//! # Cancellation
//!
//! The returned future is the cancellation handle: dropping it before it
//! resolves abandons the wait, never invokes the callback, and unsubscribes
//! every persistent handler it registered.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tracing::{debug, warn};

/// Lifecycle events that may signal a finished style load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StyleEvent {
  /// The style finished loading.
  StyleLoad,
  /// Style data changed (sources or layers added, removed or loaded).
  StyleData,
  /// The renderer has nothing left to do.
  Idle,
}

impl StyleEvent {
  pub const ALL: [StyleEvent; 3] = [StyleEvent::StyleLoad, StyleEvent::StyleData, StyleEvent::Idle];

  /// The event name a renderer uses for this event.
  pub fn name(self) -> &'static str {
    match self {
      StyleEvent::StyleLoad => "style.load",
      StyleEvent::StyleData => "styledata",
      StyleEvent::Idle => "idle",
    }
  }
}

impl fmt::Display for StyleEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Callback registered with a renderer for one event.
pub type EventHandler = Arc<dyn Fn(StyleEvent) + Send + Sync>;

/// Identifies a persistent subscription so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Which subscription mechanism a renderer offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCapability {
  /// `on` / `off` pairs.
  Persistent,
  /// `once` only; handlers are dropped by the renderer after firing.
  OneShot,
  /// No events at all.
  Unavailable,
}

/// The part of a renderer that reports style loading progress.
///
/// Implementations declare their subscription mechanism through
/// [`event_capability`](StyleLifecycle::event_capability) and override the
/// matching methods. The defaults describe a renderer without events.
pub trait StyleLifecycle {
  fn is_style_loaded(&self) -> bool;

  fn event_capability(&self) -> EventCapability {
    EventCapability::Unavailable
  }

  /// Registers a persistent handler. Only called for [`EventCapability::Persistent`].
  fn on(&self, _event: StyleEvent, _handler: EventHandler) -> Option<SubscriptionId> {
    None
  }

  /// Removes a persistent handler.
  fn off(&self, _event: StyleEvent, _id: SubscriptionId) {}

  /// Registers a handler that fires at most once. Only called for [`EventCapability::OneShot`].
  fn once(&self, _event: StyleEvent, _handler: EventHandler) {}
}

/// Shortest poll period; smaller `poll_interval` values are raised to this.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polling parameters for [`schedule_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyOptions {
  /// Raised to 1 ms if zero.
  pub poll_interval: Duration,
  /// Polls before giving up and running the callback anyway.
  pub max_polls: u32,
}

impl Default for ReadyOptions {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_millis(50),
      max_polls: 40,
    }
  }
}

/// How a [`schedule_ready`] call was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReadyOutcome {
  /// The style was loaded when the call was made.
  AlreadyLoaded,
  /// The renderer has no event mechanism; readiness was assumed.
  NoEventSource,
  /// A lifecycle event arrived and the style was loaded.
  Event(StyleEvent),
  /// A poll found the style loaded.
  Polled,
  /// The poll budget ran out before the style reported loaded.
  TimedOut,
}

/// Subscription strategy, chosen once per call from the renderer's capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchStrategy {
  Persistent,
  OneShot,
  FailOpen,
}

impl WatchStrategy {
  fn detect<R: StyleLifecycle + ?Sized>(renderer: &R) -> Self {
    match renderer.event_capability() {
      EventCapability::Persistent => WatchStrategy::Persistent,
      EventCapability::OneShot => WatchStrategy::OneShot,
      EventCapability::Unavailable => WatchStrategy::FailOpen,
    }
  }
}

/// Live event subscriptions. Unsubscribes persistent handlers on drop.
struct EventWatch<'a, R: StyleLifecycle + ?Sized> {
  renderer: &'a R,
  subscriptions: Vec<(StyleEvent, SubscriptionId)>,
}

impl<'a, R: StyleLifecycle + ?Sized> EventWatch<'a, R> {
  fn subscribe(renderer: &'a R, strategy: WatchStrategy, tx: mpsc::UnboundedSender<StyleEvent>) -> Self {
    let mut subscriptions = Vec::new();

    for event in StyleEvent::ALL {
      let tx = tx.clone();
      let handler: EventHandler = Arc::new(move |fired| {
        // The receiver is gone once the wait has finished.
        let _ = tx.send(fired);
      });

      match strategy {
        WatchStrategy::Persistent => {
          if let Some(id) = renderer.on(event, handler) {
            subscriptions.push((event, id));
          }
        }
        WatchStrategy::OneShot => renderer.once(event, handler),
        WatchStrategy::FailOpen => {}
      }
    }

    Self {
      renderer,
      subscriptions,
    }
  }
}

impl<R: StyleLifecycle + ?Sized> Drop for EventWatch<'_, R> {
  fn drop(&mut self) {
    for (event, id) in self.subscriptions.drain(..) {
      self.renderer.off(event, id);
    }
  }
}

/// Runs `callback` exactly once, as soon as `renderer` reports its style loaded.
///
/// - Already loaded: the callback runs on the first poll of the future.
/// - No event mechanism: the callback runs immediately (fail open).
/// - Otherwise: lifecycle events and a bounded poll race to confirm readiness.
///   After `options.max_polls` unsuccessful polls the callback runs regardless.
///
/// All subscriptions are torn down before the callback runs.
pub async fn schedule_ready<R, F>(renderer: &R, options: &ReadyOptions, callback: F) -> ReadyOutcome
where
  R: StyleLifecycle + ?Sized,
  F: FnOnce(),
{
  if renderer.is_style_loaded() {
    callback();
    return ReadyOutcome::AlreadyLoaded;
  }

  let strategy = WatchStrategy::detect(renderer);
  if strategy == WatchStrategy::FailOpen {
    debug!("renderer exposes no lifecycle events, assuming style is ready");
    callback();
    return ReadyOutcome::NoEventSource;
  }

  let (tx, mut rx) = mpsc::unbounded_channel();
  let watch = EventWatch::subscribe(renderer, strategy, tx);
  debug!(?strategy, "waiting for style to load");

  let period = options.poll_interval.max(MIN_POLL_INTERVAL);
  let mut poll = interval_at(Instant::now() + period, period);
  let mut polls = 0u32;

  let outcome = loop {
    tokio::select! {
      Some(event) = rx.recv() => {
        if renderer.is_style_loaded() {
          break ReadyOutcome::Event(event);
        }
        debug!(event = %event, "lifecycle event fired before style finished loading");
      }
      _ = poll.tick() => {
        polls += 1;
        if renderer.is_style_loaded() {
          break ReadyOutcome::Polled;
        }
        if polls >= options.max_polls {
          warn!(polls, "style did not report loaded, proceeding anyway");
          break ReadyOutcome::TimedOut;
        }
      }
    }
  };

  drop(watch);
  callback();
  outcome
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

  /// Scriptable renderer lifecycle.
  struct MockLifecycle {
    capability: EventCapability,
    loaded: AtomicBool,
    next_id: AtomicU64,
    persistent: Mutex<Vec<(StyleEvent, SubscriptionId, EventHandler)>>,
    one_shot: Mutex<HashMap<StyleEvent, EventHandler>>,
    on_calls: AtomicUsize,
    off_calls: AtomicUsize,
    once_calls: AtomicUsize,
  }

  impl MockLifecycle {
    fn new(capability: EventCapability) -> Self {
      Self {
        capability,
        loaded: AtomicBool::new(false),
        next_id: AtomicU64::new(0),
        persistent: Mutex::new(Vec::new()),
        one_shot: Mutex::new(HashMap::new()),
        on_calls: AtomicUsize::new(0),
        off_calls: AtomicUsize::new(0),
        once_calls: AtomicUsize::new(0),
      }
    }

    fn set_loaded(&self, loaded: bool) {
      self.loaded.store(loaded, Ordering::SeqCst);
    }

    fn emit(&self, event: StyleEvent) {
      let mut handlers: Vec<EventHandler> = self
        .persistent
        .lock()
        .unwrap()
        .iter()
        .filter(|(e, _, _)| *e == event)
        .map(|(_, _, h)| h.clone())
        .collect();
      if let Some(handler) = self.one_shot.lock().unwrap().remove(&event) {
        handlers.push(handler);
      }
      for handler in handlers {
        handler(event);
      }
    }

    fn active_subscriptions(&self) -> usize {
      self.persistent.lock().unwrap().len()
    }
  }

  impl StyleLifecycle for MockLifecycle {
    fn is_style_loaded(&self) -> bool {
      self.loaded.load(Ordering::SeqCst)
    }

    fn event_capability(&self) -> EventCapability {
      self.capability
    }

    fn on(&self, event: StyleEvent, handler: EventHandler) -> Option<SubscriptionId> {
      self.on_calls.fetch_add(1, Ordering::SeqCst);
      let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
      self.persistent.lock().unwrap().push((event, id, handler));
      Some(id)
    }

    fn off(&self, _event: StyleEvent, id: SubscriptionId) {
      self.off_calls.fetch_add(1, Ordering::SeqCst);
      self.persistent.lock().unwrap().retain(|(_, sub, _)| *sub != id);
    }

    fn once(&self, event: StyleEvent, handler: EventHandler) {
      self.once_calls.fetch_add(1, Ordering::SeqCst);
      self.one_shot.lock().unwrap().insert(event, handler);
    }
  }

  /// Only knows whether its style is loaded.
  struct BareRenderer;

  impl StyleLifecycle for BareRenderer {
    fn is_style_loaded(&self) -> bool {
      false
    }
  }

  fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let inner = count.clone();
    (count, move || {
      inner.fetch_add(1, Ordering::SeqCst);
    })
  }

  fn spawn_wait(
    renderer: Arc<MockLifecycle>,
    options: ReadyOptions,
  ) -> (Arc<AtomicUsize>, tokio::task::JoinHandle<ReadyOutcome>) {
    let (count, callback) = counter();
    let handle = tokio::spawn(async move { schedule_ready(&*renderer, &options, callback).await });
    (count, handle)
  }

  #[tokio::test]
  async fn runs_immediately_when_already_loaded() {
    let renderer = MockLifecycle::new(EventCapability::Persistent);
    renderer.set_loaded(true);
    let (count, callback) = counter();

    let outcome = schedule_ready(&renderer, &ReadyOptions::default(), callback).await;

    assert_eq!(outcome, ReadyOutcome::AlreadyLoaded);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.on_calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn fails_open_without_event_mechanism() {
    let (count, callback) = counter();

    let outcome = schedule_ready(&BareRenderer, &ReadyOptions::default(), callback).await;

    assert_eq!(outcome, ReadyOutcome::NoEventSource);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn resolves_on_event_once_loaded() {
    let renderer = Arc::new(MockLifecycle::new(EventCapability::Persistent));
    let (count, handle) = spawn_wait(renderer.clone(), ReadyOptions::default());

    tokio::task::yield_now().await;
    assert_eq!(renderer.on_calls.load(Ordering::SeqCst), 3);

    renderer.emit(StyleEvent::StyleLoad);
    tokio::task::yield_now().await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    renderer.set_loaded(true);
    renderer.emit(StyleEvent::Idle);

    let outcome = handle.await.unwrap();
    assert_eq!(outcome, ReadyOutcome::Event(StyleEvent::Idle));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.off_calls.load(Ordering::SeqCst), 3);
    assert_eq!(renderer.active_subscriptions(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn polls_when_events_never_confirm() {
    let renderer = Arc::new(MockLifecycle::new(EventCapability::Persistent));
    let (count, handle) = spawn_wait(renderer.clone(), ReadyOptions::default());

    tokio::time::sleep(Duration::from_millis(180)).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    renderer.set_loaded(true);
    let outcome = handle.await.unwrap();

    assert_eq!(outcome, ReadyOutcome::Polled);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.active_subscriptions(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn gives_up_after_poll_budget() {
    let renderer = Arc::new(MockLifecycle::new(EventCapability::Persistent));
    let options = ReadyOptions {
      poll_interval: Duration::from_millis(10),
      max_polls: 5,
    };
    let (count, handle) = spawn_wait(renderer.clone(), options);

    let outcome = handle.await.unwrap();

    assert_eq!(outcome, ReadyOutcome::TimedOut);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.active_subscriptions(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn zero_poll_interval_still_times_out() {
    let renderer = Arc::new(MockLifecycle::new(EventCapability::Persistent));
    let options = ReadyOptions {
      poll_interval: Duration::ZERO,
      max_polls: 3,
    };
    let (count, handle) = spawn_wait(renderer.clone(), options);

    let outcome = handle.await.unwrap();

    assert_eq!(outcome, ReadyOutcome::TimedOut);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.active_subscriptions(), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn supports_one_shot_renderers() {
    let renderer = Arc::new(MockLifecycle::new(EventCapability::OneShot));
    let (count, handle) = spawn_wait(renderer.clone(), ReadyOptions::default());

    tokio::task::yield_now().await;
    assert_eq!(renderer.once_calls.load(Ordering::SeqCst), 3);

    renderer.emit(StyleEvent::StyleData);
    tokio::task::yield_now().await;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    renderer.set_loaded(true);
    renderer.emit(StyleEvent::Idle);

    assert_eq!(handle.await.unwrap(), ReadyOutcome::Event(StyleEvent::Idle));
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn one_shot_renderer_without_events_still_resolves() {
    let renderer = Arc::new(MockLifecycle::new(EventCapability::OneShot));
    let (count, handle) = spawn_wait(renderer.clone(), ReadyOptions::default());

    tokio::time::sleep(Duration::from_millis(120)).await;
    renderer.set_loaded(true);

    assert_eq!(handle.await.unwrap(), ReadyOutcome::Polled);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn dropping_the_wait_unsubscribes_without_running_callback() {
    let renderer = Arc::new(MockLifecycle::new(EventCapability::Persistent));
    let (count, handle) = spawn_wait(renderer.clone(), ReadyOptions::default());

    tokio::task::yield_now().await;
    assert_eq!(renderer.active_subscriptions(), 3);

    handle.abort();
    let _ = handle.await;

    assert_eq!(renderer.active_subscriptions(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
  }
}
