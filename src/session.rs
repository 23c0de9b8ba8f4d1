//! The session manager: owns every light entity, drives each light's
//! connection state machine on its own task, and serializes command
//! delivery per light.
//!
//! Failure containment is the organizing principle here: everything that
//! can go wrong with one light (slow handshake, lost link, exhausted write
//! retries) stays inside that light's task and surfaces as a state change
//! or a per-address outcome, never as an error that crosses over to a
//! sibling light or brings down the manager.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::StreamExt;
use futures::future::join_all;
use log::{debug, error, warn};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::{GlobalConfig, LightPreferences, PreferenceSource};
use crate::discovery::scan_for_lights;
use crate::entity::{ConnectionState, LightEntity, LightSnapshot};
use crate::errors::Error;
use crate::identity::{LightAddress, LightIdentity};
use crate::parameters::LightParameters;
use crate::presets::{PresetSlot, PresetStore, RecallAction};
use crate::protocol::{self, PowerChannelStatus};
use crate::transport::{Link, Transport};
use crate::types::TemperatureRange;

type Result<T> = std::result::Result<T, Error>;

/// Per-address outcome of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Encoded, written, and acknowledged by the write path.
    Applied,
    /// Target is not currently connected (or lost its link mid-write).
    Unreachable,
    /// Refused before any write was attempted.
    Rejected(String),
    /// Snapshot recall had no captured state for this target.
    Skipped,
}

/// Outcomes keyed by target address.
pub type OutcomeMap = HashMap<LightAddress, SubmitOutcome>;

/// Engine events observers can subscribe to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Discovered {
        address: LightAddress,
    },
    StateChanged {
        address: LightAddress,
        state: ConnectionState,
    },
    StatusUpdated {
        address: LightAddress,
        status: PowerChannelStatus,
    },
}

/// What [`SessionManager::save_preset`] captures.
#[derive(Debug, Clone)]
pub enum PresetSaveMode {
    /// Store the given parameter set once, applied to any target on recall.
    Global(LightParameters),
    /// Capture the exact state of every connected light at this instant.
    Snapshot,
}

/// Entity mutation performed after a successful write.
enum AppliedEffect {
    Parameters(LightParameters),
    Power(bool),
}

/// One queued write for a light's task.
struct Outbound {
    frames: Vec<Vec<u8>>,
    effect: AppliedEffect,
    reply: Option<oneshot::Sender<Result<()>>>,
}

struct LightRuntime {
    commands: mpsc::UnboundedSender<Outbound>,
    task: JoinHandle<()>,
    /// Identifies which spawned task this runtime belongs to, so a task
    /// exiting late cannot tear down a successor installed by a newer
    /// connect request.
    id: u64,
}

struct ManagedLight {
    entity: LightEntity,
    runtime: Option<LightRuntime>,
}

struct SessionInner<T: Transport, P: PreferenceSource> {
    transport: T,
    preferences: P,
    config: GlobalConfig,
    lights: Mutex<HashMap<LightAddress, ManagedLight>>,
    presets: Mutex<PresetStore>,
    events: broadcast::Sender<SessionEvent>,
    next_task_id: AtomicU64,
}

/// Owns the managed set of lights and the preset registry.
///
/// Cheap to clone; all clones share the same managed set. External
/// callers only read [`LightSnapshot`] copies and issue intent through
/// this API; no caller ever holds a reference into the managed set.
pub struct SessionManager<T: Transport, P: PreferenceSource> {
    inner: Arc<SessionInner<T, P>>,
}

impl<T: Transport, P: PreferenceSource> Clone for SessionManager<T, P> {
    fn clone(&self) -> Self {
        SessionManager {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport, P: PreferenceSource> SessionManager<T, P> {
    pub fn new(transport: T, config: GlobalConfig, preferences: P) -> Self {
        let (events, _) = broadcast::channel(64);
        SessionManager {
            inner: Arc::new(SessionInner {
                transport,
                preferences,
                config,
                lights: Mutex::new(HashMap::new()),
                presets: Mutex::new(PresetStore::new()),
                events,
                next_task_id: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribe to state changes and status updates.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Run a scan and register every qualifying fixture.
    ///
    /// Re-sighted fixtures only get their signal strength refreshed. When
    /// auto-connect is configured, newly registered fixtures get a
    /// connection attempt immediately. Returns the addresses that were new.
    pub async fn discover(&self, duration: Duration) -> Result<Vec<LightAddress>> {
        let candidates = scan_for_lights(
            &self.inner.transport,
            duration,
            &self.inner.config.whitelisted_addresses,
        )
        .await?;

        let mut fresh = Vec::new();
        for identity in candidates {
            if self.add_light(identity.clone()).await {
                fresh.push(identity.address);
            }
        }

        if self.inner.config.auto_connect_on_discover {
            for address in &fresh {
                if let Err(e) = self.connect(address).await {
                    warn!("{address}: auto-connect failed: {e}");
                }
            }
        }
        Ok(fresh)
    }

    /// Register a fixture directly (whitelist add, tests).
    ///
    /// Returns `false` if the address was already managed; in that case
    /// only the signal-strength reading is refreshed; identity and saved
    /// preferences are never overwritten by a re-sighting.
    pub async fn add_light(&self, identity: LightIdentity) -> bool {
        let mut lights = self.inner.lights.lock().await;
        if let Some(existing) = lights.get_mut(&identity.address) {
            if identity.rssi.is_some() {
                existing.entity.identity.rssi = identity.rssi;
            }
            return false;
        }

        let address = identity.address.clone();
        let preferences = self
            .inner
            .preferences
            .load(&address)
            .unwrap_or_default();
        debug!("registering {address} ({})", identity.name);
        lights.insert(
            address.clone(),
            ManagedLight {
                entity: LightEntity::new(identity, preferences),
                runtime: None,
            },
        );
        self.inner.emit(SessionEvent::Discovered { address });
        true
    }

    /// Snapshots of every managed light, ordered by address.
    pub async fn list_lights(&self) -> Vec<LightSnapshot> {
        let lights = self.inner.lights.lock().await;
        let mut snapshots: Vec<_> = lights.values().map(|m| m.entity.snapshot()).collect();
        snapshots.sort_by(|a, b| a.address.as_str().cmp(b.address.as_str()));
        snapshots
    }

    pub async fn snapshot(&self, address: &LightAddress) -> Option<LightSnapshot> {
        let lights = self.inner.lights.lock().await;
        lights.get(address).map(|m| m.entity.snapshot())
    }

    /// Start (or restart) this light's connection state machine.
    ///
    /// The attempt counter starts fresh on every explicit connect request.
    /// No-op when the light is already connecting or connected.
    pub async fn connect(&self, address: &LightAddress) -> Result<()> {
        let mut lights = self.inner.lights.lock().await;
        let managed = lights
            .get_mut(address)
            .ok_or_else(|| Error::UnknownLight(address.clone()))?;
        if matches!(
            managed.entity.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return Ok(());
        }

        managed.entity.state = ConnectionState::Connecting;
        self.inner.emit(SessionEvent::StateChanged {
            address: address.clone(),
            state: ConnectionState::Connecting,
        });

        let task_id = self.inner.next_task_id.fetch_add(1, Ordering::Relaxed);
        let (commands, queue) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_light(
            Arc::clone(&self.inner),
            address.clone(),
            task_id,
            queue,
        ));
        managed.runtime = Some(LightRuntime {
            commands,
            task,
            id: task_id,
        });
        Ok(())
    }

    /// Drop the light's link, cancelling any in-flight operation.
    ///
    /// The entity stays registered with all preferences intact and is
    /// eligible for a fresh connect at any time.
    pub async fn disconnect(&self, address: &LightAddress) -> Result<()> {
        let mut lights = self.inner.lights.lock().await;
        let managed = lights
            .get_mut(address)
            .ok_or_else(|| Error::UnknownLight(address.clone()))?;
        if let Some(runtime) = managed.runtime.take() {
            runtime.task.abort();
        }
        if managed.entity.state != ConnectionState::Disconnected {
            managed.entity.state = ConnectionState::Disconnected;
            self.inner.emit(SessionEvent::StateChanged {
                address: address.clone(),
                state: ConnectionState::Disconnected,
            });
        }
        Ok(())
    }

    /// Forget a light entirely. Terminal; in-flight operations are
    /// cancelled, not awaited.
    pub async fn remove(&self, address: &LightAddress) -> Result<()> {
        let mut lights = self.inner.lights.lock().await;
        let mut managed = lights
            .remove(address)
            .ok_or_else(|| Error::UnknownLight(address.clone()))?;
        if let Some(runtime) = managed.runtime.take() {
            runtime.task.abort();
        }
        self.inner.emit(SessionEvent::StateChanged {
            address: address.clone(),
            state: ConnectionState::Removed,
        });
        Ok(())
    }

    /// Cancel every in-flight operation and drop all links. Entities stay
    /// registered.
    pub async fn shutdown(&self) {
        let mut lights = self.inner.lights.lock().await;
        for (address, managed) in lights.iter_mut() {
            if let Some(runtime) = managed.runtime.take() {
                runtime.task.abort();
            }
            if matches!(
                managed.entity.state,
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                managed.entity.state = ConnectionState::Disconnected;
                self.inner.emit(SessionEvent::StateChanged {
                    address: address.clone(),
                    state: ConnectionState::Disconnected,
                });
            }
        }
    }

    /// Apply one parameter set to many targets.
    ///
    /// Each target is resolved independently: disconnected targets come
    /// back as [`SubmitOutcome::Unreachable`], capability or bounds
    /// violations as [`SubmitOutcome::Rejected`], and one target's failure
    /// never aborts the batch.
    pub async fn set_parameters(
        &self,
        addresses: &[LightAddress],
        parameters: &LightParameters,
    ) -> OutcomeMap {
        let mut outcomes = OutcomeMap::new();
        let mut pending = Vec::new();
        {
            let mut lights = self.inner.lights.lock().await;
            for address in addresses {
                let Some(managed) = lights.get_mut(address) else {
                    outcomes.insert(
                        address.clone(),
                        SubmitOutcome::Rejected("unknown light".into()),
                    );
                    continue;
                };
                match enqueue_parameters(managed, parameters) {
                    Ok(receiver) => pending.push((address.clone(), receiver)),
                    Err(outcome) => {
                        outcomes.insert(address.clone(), outcome);
                    }
                }
            }
        }
        collect_outcomes(&mut outcomes, pending).await;
        outcomes
    }

    /// Turn targets on: a protocol-level power-on, followed by the light's
    /// last known parameters when it has any.
    pub async fn turn_on(&self, addresses: &[LightAddress]) -> OutcomeMap {
        self.submit_power(addresses, true).await
    }

    /// Turn targets off with a protocol-level power toggle, remembering
    /// that the operator did so (suppresses auto-restore on reconnect).
    pub async fn turn_off(&self, addresses: &[LightAddress]) -> OutcomeMap {
        self.submit_power(addresses, false).await
    }

    async fn submit_power(&self, addresses: &[LightAddress], on: bool) -> OutcomeMap {
        let mut outcomes = OutcomeMap::new();
        let mut pending = Vec::new();
        {
            let mut lights = self.inner.lights.lock().await;
            for address in addresses {
                let Some(managed) = lights.get_mut(address) else {
                    outcomes.insert(
                        address.clone(),
                        SubmitOutcome::Rejected("unknown light".into()),
                    );
                    continue;
                };
                match enqueue_power(managed, on) {
                    Ok(receiver) => pending.push((address.clone(), receiver)),
                    Err(outcome) => {
                        outcomes.insert(address.clone(), outcome);
                    }
                }
            }
        }
        collect_outcomes(&mut outcomes, pending).await;
        outcomes
    }

    /// Update a light's preferences and hand them to the persistence
    /// collaborator.
    pub async fn set_preferences(
        &self,
        address: &LightAddress,
        preferences: LightPreferences,
    ) -> Result<()> {
        {
            let mut lights = self.inner.lights.lock().await;
            let managed = lights
                .get_mut(address)
                .ok_or_else(|| Error::UnknownLight(address.clone()))?;
            managed.entity.preferences = preferences.clone();
        }
        self.inner.preferences.persist(address, &preferences);
        Ok(())
    }

    /// Save a preset slot.
    pub async fn save_preset(&self, slot: usize, mode: PresetSaveMode) -> Result<()> {
        let contents = match mode {
            PresetSaveMode::Global(parameters) => PresetSlot::Global { parameters },
            PresetSaveMode::Snapshot => {
                let lights = self.inner.lights.lock().await;
                let per_light = lights
                    .values()
                    .filter(|m| m.entity.state == ConnectionState::Connected)
                    .filter_map(|m| {
                        m.entity
                            .last_parameters
                            .clone()
                            .map(|p| (m.entity.address().clone(), p))
                    })
                    .collect();
                PresetSlot::Snapshot { per_light }
            }
        };
        self.inner.presets.lock().await.save(slot, contents)
    }

    /// Recall a preset against the given targets.
    ///
    /// Global presets clamp per target; snapshot presets apply only to the
    /// lights they captured, and targets that are absent or disconnected
    /// at recall time are skipped, not errored.
    pub async fn recall_preset(
        &self,
        slot: usize,
        addresses: &[LightAddress],
    ) -> Result<OutcomeMap> {
        let is_snapshot = self.inner.presets.lock().await.is_snapshot(slot)?;

        let mut outcomes = OutcomeMap::new();
        let mut targets: Vec<(LightAddress, TemperatureRange)> = Vec::new();
        {
            let lights = self.inner.lights.lock().await;
            for address in addresses {
                match lights.get(address) {
                    Some(managed) => {
                        targets.push((address.clone(), managed.entity.temperature_range()));
                    }
                    None => {
                        outcomes.insert(
                            address.clone(),
                            SubmitOutcome::Rejected("unknown light".into()),
                        );
                    }
                }
            }
        }

        let plan = self.inner.presets.lock().await.recall_plan(slot, &targets)?;

        let mut pending = Vec::new();
        {
            let mut lights = self.inner.lights.lock().await;
            for (address, action) in plan {
                let RecallAction::Apply(parameters) = action else {
                    outcomes.insert(address, SubmitOutcome::Skipped);
                    continue;
                };
                let Some(managed) = lights.get_mut(&address) else {
                    outcomes.insert(address, SubmitOutcome::Unreachable);
                    continue;
                };
                // Recall clamps instead of rejecting: capability range in
                // the plan, wire bounds here.
                let parameters = parameters
                    .clamped_to(&protocol::cct_wire_range(managed.entity.variant()));
                match enqueue_parameters(managed, &parameters) {
                    Ok(receiver) => pending.push((address, receiver)),
                    Err(SubmitOutcome::Unreachable) if is_snapshot => {
                        // A captured light that is gone right now is a
                        // skip, not an error.
                        outcomes.insert(address, SubmitOutcome::Skipped);
                    }
                    Err(outcome) => {
                        outcomes.insert(address, outcome);
                    }
                }
            }
        }
        collect_outcomes(&mut outcomes, pending).await;
        Ok(outcomes)
    }

    /// Restore a slot to its built-in default.
    pub async fn reset_preset(&self, slot: usize) -> Result<()> {
        self.inner.presets.lock().await.reset(slot)
    }

    /// Whether a slot differs from its built-in default.
    pub async fn preset_is_custom(&self, slot: usize) -> Result<bool> {
        self.inner.presets.lock().await.is_custom(slot)
    }
}

/// Validate and queue a parameter write for one light.
fn enqueue_parameters(
    managed: &mut ManagedLight,
    parameters: &LightParameters,
) -> std::result::Result<oneshot::Receiver<Result<()>>, SubmitOutcome> {
    let entity = &managed.entity;
    if !entity.variant().is_lighting() {
        return Err(SubmitOutcome::Rejected(
            "device advertises no lighting capability".into(),
        ));
    }
    if entity.preferences.cct_only && !parameters.is_cct() {
        return Err(SubmitOutcome::Rejected("fixture is CCT-only".into()));
    }
    let frames = protocol::encode(entity.variant(), parameters)
        .map_err(|e| SubmitOutcome::Rejected(e.to_string()))?;
    enqueue(
        managed,
        Outbound {
            frames,
            effect: AppliedEffect::Parameters(parameters.clone()),
            reply: None,
        },
    )
}

/// Validate and queue a power toggle (plus restore frames when turning on).
fn enqueue_power(
    managed: &mut ManagedLight,
    on: bool,
) -> std::result::Result<oneshot::Receiver<Result<()>>, SubmitOutcome> {
    let entity = &managed.entity;
    let mut frames = vec![
        protocol::encode_power(entity.variant(), on)
            .map_err(|e| SubmitOutcome::Rejected(e.to_string()))?,
    ];
    if on {
        if let Some(parameters) = &entity.last_parameters {
            // Bring the light back to where it was, not just powered.
            if let Ok(mut restore) = protocol::encode(entity.variant(), parameters) {
                frames.append(&mut restore);
            }
        }
    }
    enqueue(
        managed,
        Outbound {
            frames,
            effect: AppliedEffect::Power(on),
            reply: None,
        },
    )
}

fn enqueue(
    managed: &mut ManagedLight,
    mut outbound: Outbound,
) -> std::result::Result<oneshot::Receiver<Result<()>>, SubmitOutcome> {
    if managed.entity.state != ConnectionState::Connected {
        return Err(SubmitOutcome::Unreachable);
    }
    let Some(runtime) = &managed.runtime else {
        return Err(SubmitOutcome::Unreachable);
    };
    let (reply, receiver) = oneshot::channel();
    outbound.reply = Some(reply);
    if runtime.commands.send(outbound).is_err() {
        // The task already exited; the light is effectively gone.
        return Err(SubmitOutcome::Unreachable);
    }
    Ok(receiver)
}

/// Await all queued replies and fold them into the outcome map.
async fn collect_outcomes(
    outcomes: &mut OutcomeMap,
    pending: Vec<(LightAddress, oneshot::Receiver<Result<()>>)>,
) {
    let (addresses, receivers): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
    let results = join_all(receivers).await;
    for (address, result) in addresses.into_iter().zip(results) {
        let outcome = match result {
            Ok(Ok(())) => SubmitOutcome::Applied,
            // A write failure or a cancelled task both mean the light is
            // no longer reachable.
            Ok(Err(_)) | Err(_) => SubmitOutcome::Unreachable,
        };
        outcomes.insert(address, outcome);
    }
}

impl<T: Transport, P: PreferenceSource> SessionInner<T, P> {
    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    async fn set_state(&self, address: &LightAddress, state: ConnectionState) {
        let mut lights = self.lights.lock().await;
        if let Some(managed) = lights.get_mut(address) {
            if managed.entity.state != state {
                debug!("{address}: {:?} -> {state:?}", managed.entity.state);
                managed.entity.state = state;
                self.emit(SessionEvent::StateChanged {
                    address: address.clone(),
                    state,
                });
            }
        }
    }

    async fn with_entity<R>(
        &self,
        address: &LightAddress,
        read: impl FnOnce(&LightEntity) -> R,
    ) -> Option<R> {
        let lights = self.lights.lock().await;
        lights.get(address).map(|m| read(&m.entity))
    }

    async fn apply_effect(&self, address: &LightAddress, effect: &AppliedEffect) {
        let mut lights = self.lights.lock().await;
        let Some(managed) = lights.get_mut(address) else {
            return;
        };
        match effect {
            AppliedEffect::Parameters(parameters) => {
                managed.entity.last_parameters = Some(parameters.clone());
                managed.entity.manually_toggled_off = false;
            }
            AppliedEffect::Power(on) => {
                managed.entity.manually_toggled_off = !on;
            }
        }
    }

    async fn record_status(&self, address: &LightAddress, status: PowerChannelStatus) {
        let mut lights = self.lights.lock().await;
        if let Some(managed) = lights.get_mut(address) {
            managed.entity.power_and_channel = Some(status);
        }
        self.emit(SessionEvent::StatusUpdated {
            address: address.clone(),
            status,
        });
    }

}

/// One light's whole lifecycle: bounded connection attempts, notification
/// handling, and serialized command delivery.
async fn run_light<T: Transport, P: PreferenceSource>(
    inner: Arc<SessionInner<T, P>>,
    address: LightAddress,
    task_id: u64,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
) {
    let config = inner.config.clone();
    let Some(variant) = inner.with_entity(&address, |e| e.variant()).await else {
        return;
    };

    // Connecting: bounded attempts with a fixed delay between them.
    let mut link = None;
    for attempt in 1..=config.max_connection_attempts {
        match tokio::time::timeout(config.connect_timeout(), inner.transport.connect(&address))
            .await
        {
            Ok(Ok(established)) => {
                debug!("{address}: link up on attempt {attempt}");
                link = Some(established);
                break;
            }
            Ok(Err(e)) => debug!("{address}: connect attempt {attempt} failed: {e}"),
            Err(_) => debug!("{address}: connect attempt {attempt} timed out"),
        }
        if attempt < config.max_connection_attempts {
            tokio::time::sleep(config.retry_delay()).await;
        }
    }
    let Some(link) = link else {
        let exhausted = Error::ConnectionExhausted {
            address: address.clone(),
            attempts: config.max_connection_attempts,
        };
        error!("{exhausted}");
        abandon(&inner, &address, task_id, None::<&T::Link>, &mut queue).await;
        return;
    };

    let mut notifications = match link.notifications().await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("{address}: notification subscribe failed: {e}");
            futures::stream::pending::<Vec<u8>>().boxed()
        }
    };

    inner.set_state(&address, ConnectionState::Connected).await;

    // Auto-restore the last known parameters, unless the operator had
    // turned this light off on purpose.
    let remembered = inner
        .with_entity(&address, |e| {
            (e.last_parameters.clone(), e.manually_toggled_off)
        })
        .await;
    if let Some((Some(parameters), false)) = remembered {
        match protocol::encode(variant, &parameters) {
            Ok(frames) => {
                if let Err(e) = write_frames(&link, &frames, &config, &address).await {
                    error!("{address}: restore write failed: {e}");
                    abandon(&inner, &address, task_id, Some(&link), &mut queue).await;
                    return;
                }
                debug!("{address}: restored {parameters:?}");
            }
            Err(e) => warn!("{address}: remembered parameters no longer encode: {e}"),
        }
    }

    // Ask for the current power/channel state; best effort.
    let status_request = protocol::encode_status_request(variant);
    if let Err(e) = write_frames(&link, &[status_request], &config, &address).await {
        warn!("{address}: status request failed: {e}");
    }

    loop {
        tokio::select! {
            command = queue.recv() => {
                let Some(command) = command else {
                    // Queue owner is gone; same teardown as any other exit.
                    abandon(&inner, &address, task_id, Some(&link), &mut queue).await;
                    return;
                };
                match write_frames(&link, &command.frames, &config, &address).await {
                    Ok(()) => {
                        inner.apply_effect(&address, &command.effect).await;
                        if let Some(reply) = command.reply {
                            let _ = reply.send(Ok(()));
                        }
                    }
                    Err(e) => {
                        error!("{address}: write retries exhausted: {e}");
                        if let Some(reply) = command.reply {
                            let _ = reply.send(Err(e));
                        }
                        abandon(&inner, &address, task_id, Some(&link), &mut queue).await;
                        return;
                    }
                }
            }
            notification = notifications.next() => {
                let Some(raw) = notification else {
                    warn!("{address}: notification channel closed, link lost");
                    abandon(&inner, &address, task_id, Some(&link), &mut queue).await;
                    return;
                };
                match protocol::decode_notification(variant, &raw) {
                    Ok(status) => inner.record_status(&address, status).await,
                    // A single corrupt packet is logged and discarded; it
                    // is not a disconnect.
                    Err(e) => warn!("{address}: discarding malformed notification: {e}"),
                }
            }
        }
    }
}

/// Write a command's frames in order, retrying each frame against the
/// light's budget. A timeout counts the same as a transport failure.
async fn write_frames<L: Link>(
    link: &L,
    frames: &[Vec<u8>],
    config: &GlobalConfig,
    address: &LightAddress,
) -> Result<()> {
    for frame in frames {
        let mut last_error = Error::write(address, "no attempt made");
        let mut delivered = false;
        for attempt in 1..=config.max_connection_attempts {
            match tokio::time::timeout(config.write_timeout(), link.write(frame)).await {
                Ok(Ok(())) => {
                    delivered = true;
                    break;
                }
                Ok(Err(e)) => {
                    debug!("{address}: write attempt {attempt} failed: {e}");
                    last_error = e;
                }
                Err(_) => {
                    debug!("{address}: write attempt {attempt} timed out");
                    last_error = Error::Timeout;
                }
            }
            if attempt < config.max_connection_attempts {
                tokio::time::sleep(config.retry_delay()).await;
            }
        }
        if !delivered {
            return Err(last_error);
        }
    }
    Ok(())
}

/// Common exit path for a light task: tear the link down, regress the
/// state machine, and fail any writes still queued behind us.
///
/// The runtime clear and the state regression happen under a single lock
/// acquisition, and only when the stored runtime still belongs to this
/// task. A newer connect request may already have installed a successor
/// runtime; in that case the dying task must leave both the entry and the
/// state alone.
async fn abandon<T: Transport, P: PreferenceSource, L: Link>(
    inner: &Arc<SessionInner<T, P>>,
    address: &LightAddress,
    task_id: u64,
    link: Option<&L>,
    queue: &mut mpsc::UnboundedReceiver<Outbound>,
) {
    if let Some(link) = link {
        let _ = link.disconnect().await;
    }
    {
        let mut lights = inner.lights.lock().await;
        if let Some(managed) = lights.get_mut(address) {
            let owns_entry = managed
                .runtime
                .as_ref()
                .is_some_and(|runtime| runtime.id == task_id);
            if owns_entry {
                managed.runtime = None;
                if managed.entity.state != ConnectionState::Disconnected {
                    debug!("{address}: {:?} -> Disconnected", managed.entity.state);
                    managed.entity.state = ConnectionState::Disconnected;
                    inner.emit(SessionEvent::StateChanged {
                        address: address.clone(),
                        state: ConnectionState::Disconnected,
                    });
                }
            }
        }
    }
    queue.close();
    while let Ok(command) = queue.try_recv() {
        if let Some(reply) = command.reply {
            let _ = reply.send(Err(Error::NotConnected(address.clone())));
        }
    }
}
