//! End-to-end session manager tests against an in-memory transport.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{Mutex, broadcast};

use neewer_lights_rs::transport::{Advertisement, Link, NotificationStream, Transport};
use neewer_lights_rs::{
    ConnectionState, Error, GlobalConfig, LightAddress, LightIdentity, LightParameters,
    LightPreferences, NoPreferences, PresetSaveMode, ProtocolVariant, SessionEvent,
    SessionManager, SubmitOutcome, protocol, types::TemperatureRange,
};

/// Scripted transport: per-address connection refusals, write capture, and
/// an injectable notification channel.
#[derive(Clone, Default)]
struct MockTransport {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    /// Number of connect attempts to refuse per address (`usize::MAX`
    /// refuses forever).
    refusals: Mutex<HashMap<LightAddress, usize>>,
    attempts: Mutex<HashMap<LightAddress, usize>>,
    writes: Mutex<HashMap<LightAddress, Vec<Vec<u8>>>>,
    failing_writes: Mutex<HashSet<LightAddress>>,
    notifiers: Mutex<HashMap<LightAddress, futures::channel::mpsc::UnboundedSender<Vec<u8>>>>,
}

struct MockLink {
    address: LightAddress,
    inner: Arc<MockInner>,
}

impl MockTransport {
    async fn refuse(&self, address: &LightAddress, count: usize) {
        self.inner
            .refusals
            .lock()
            .await
            .insert(address.clone(), count);
    }

    async fn attempts(&self, address: &LightAddress) -> usize {
        self.inner
            .attempts
            .lock()
            .await
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    async fn writes(&self, address: &LightAddress) -> Vec<Vec<u8>> {
        self.inner
            .writes
            .lock()
            .await
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    async fn set_write_failure(&self, address: &LightAddress, failing: bool) {
        let mut failing_writes = self.inner.failing_writes.lock().await;
        if failing {
            failing_writes.insert(address.clone());
        } else {
            failing_writes.remove(address);
        }
    }

    async fn notify(&self, address: &LightAddress, frame: Vec<u8>) {
        let notifiers = self.inner.notifiers.lock().await;
        notifiers
            .get(address)
            .expect("light not subscribed")
            .unbounded_send(frame)
            .expect("notification channel closed");
    }
}

impl Transport for MockTransport {
    type Link = MockLink;

    async fn scan(&self, _duration: Duration) -> Result<Vec<Advertisement>, Error> {
        Ok(Vec::new())
    }

    async fn connect(&self, address: &LightAddress) -> Result<MockLink, Error> {
        let attempt = {
            let mut attempts = self.inner.attempts.lock().await;
            let counter = attempts.entry(address.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        let refusals = self
            .inner
            .refusals
            .lock()
            .await
            .get(address)
            .copied()
            .unwrap_or(0);
        if attempt <= refusals {
            return Err(Error::transport("connect", "refused by script"));
        }
        Ok(MockLink {
            address: address.clone(),
            inner: Arc::clone(&self.inner),
        })
    }
}

impl Link for MockLink {
    async fn write(&self, frame: &[u8]) -> Result<(), Error> {
        if self.inner.failing_writes.lock().await.contains(&self.address) {
            return Err(Error::write(&self.address, "scripted write failure"));
        }
        self.inner
            .writes
            .lock()
            .await
            .entry(self.address.clone())
            .or_default()
            .push(frame.to_vec());
        Ok(())
    }

    async fn notifications(&self) -> Result<NotificationStream, Error> {
        let (tx, rx) = futures::channel::mpsc::unbounded();
        self.inner
            .notifiers
            .lock()
            .await
            .insert(self.address.clone(), tx);
        Ok(rx.boxed())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        Ok(())
    }
}

fn fast_config() -> GlobalConfig {
    GlobalConfig {
        max_connection_attempts: 3,
        auto_connect_on_discover: false,
        retry_delay_ms: 1,
        connect_timeout_ms: 200,
        write_timeout_ms: 200,
        ..GlobalConfig::default()
    }
}

fn session() -> (SessionManager<MockTransport, NoPreferences>, MockTransport) {
    let transport = MockTransport::default();
    let session = SessionManager::new(transport.clone(), fast_config(), NoPreferences);
    (session, transport)
}

fn addr(s: &str) -> LightAddress {
    LightAddress::new(s)
}

fn identity(name: &str, address: &str) -> LightIdentity {
    LightIdentity::new(name, addr(address), Some(-40))
}

async fn wait_for_state(
    events: &mut broadcast::Receiver<SessionEvent>,
    address: &LightAddress,
    wanted: ConnectionState,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::StateChanged {
                    address: changed,
                    state,
                }) if changed == *address && state == wanted => return,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{address} never reached {wanted:?}"));
}

/// Connect one light and block until it is command-eligible.
async fn connect_light(
    session: &SessionManager<MockTransport, NoPreferences>,
    name: &str,
    address: &str,
) -> LightAddress {
    let address = addr(address);
    session.add_light(identity(name, address.as_str())).await;
    let mut events = session.subscribe();
    session.connect(&address).await.unwrap();
    wait_for_state(&mut events, &address, ConnectionState::Connected).await;
    address
}

#[tokio::test]
async fn connect_and_apply_parameters() {
    let (session, transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:01").await;

    let parameters = LightParameters::cct(56, 50);
    let outcomes = session
        .set_parameters(std::slice::from_ref(&a), &parameters)
        .await;
    assert_eq!(outcomes[&a], SubmitOutcome::Applied);

    let expected = protocol::encode(ProtocolVariant::LegacyCombined, &parameters).unwrap();
    let writes = transport.writes(&a).await;
    assert_eq!(writes.last(), expected.last());

    let snapshot = session.snapshot(&a).await.unwrap();
    assert_eq!(snapshot.current_parameters, Some(parameters));
}

#[tokio::test]
async fn connection_attempts_are_bounded() {
    let (session, transport) = session();
    let a = addr("AA:02");
    session.add_light(identity("NEEWER-SL90", "AA:02")).await;
    transport.refuse(&a, usize::MAX).await;

    let mut events = session.subscribe();
    session.connect(&a).await.unwrap();
    wait_for_state(&mut events, &a, ConnectionState::Disconnected).await;

    assert_eq!(transport.attempts(&a).await, 3);

    // The light is now unreachable until the next explicit connect.
    let outcomes = session
        .set_parameters(std::slice::from_ref(&a), &LightParameters::cct(56, 50))
        .await;
    assert_eq!(outcomes[&a], SubmitOutcome::Unreachable);
}

#[tokio::test]
async fn transient_refusals_within_budget_still_connect() {
    let (session, transport) = session();
    let a = addr("AA:03");
    session.add_light(identity("NEEWER-SL90", "AA:03")).await;
    transport.refuse(&a, 2).await;

    let mut events = session.subscribe();
    session.connect(&a).await.unwrap();
    wait_for_state(&mut events, &a, ConnectionState::Connected).await;

    assert_eq!(transport.attempts(&a).await, 3);
}

#[tokio::test]
async fn explicit_connect_resets_the_attempt_budget() {
    let (session, transport) = session();
    let a = addr("AA:04");
    session.add_light(identity("NEEWER-SL90", "AA:04")).await;
    transport.refuse(&a, 4).await;

    let mut events = session.subscribe();
    session.connect(&a).await.unwrap();
    wait_for_state(&mut events, &a, ConnectionState::Disconnected).await;
    assert_eq!(transport.attempts(&a).await, 3);

    // Second request gets a fresh budget; attempt 5 succeeds.
    session.connect(&a).await.unwrap();
    wait_for_state(&mut events, &a, ConnectionState::Connected).await;
    assert_eq!(transport.attempts(&a).await, 5);
}

#[tokio::test]
async fn one_targets_failure_does_not_abort_the_batch() {
    let (session, _transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:05").await;
    let b = addr("AA:06");
    session.add_light(identity("NEEWER-SL60", "AA:06")).await;

    let outcomes = session
        .set_parameters(&[a.clone(), b.clone()], &LightParameters::hsi(240, 100, 20))
        .await;
    assert_eq!(outcomes[&a], SubmitOutcome::Applied);
    assert_eq!(outcomes[&b], SubmitOutcome::Unreachable);
}

#[tokio::test]
async fn out_of_range_parameters_are_rejected_before_any_write() {
    let (session, transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:07").await;
    let baseline = transport.writes(&a).await.len();

    let outcomes = session
        .set_parameters(std::slice::from_ref(&a), &LightParameters::cct(56, 150))
        .await;
    assert!(matches!(outcomes[&a], SubmitOutcome::Rejected(_)));
    assert_eq!(transport.writes(&a).await.len(), baseline);
}

#[tokio::test]
async fn non_lighting_devices_are_never_command_targets() {
    let (session, _transport) = session();
    let a = connect_light(&session, "NEEWER-RC-2.4G", "AA:08").await;

    let outcomes = session
        .set_parameters(std::slice::from_ref(&a), &LightParameters::cct(56, 50))
        .await;
    assert!(matches!(outcomes[&a], SubmitOutcome::Rejected(_)));
}

#[tokio::test]
async fn turn_on_replays_the_last_parameters() {
    let (session, transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:09").await;
    let parameters = LightParameters::hsi(120, 100, 40);
    session
        .set_parameters(std::slice::from_ref(&a), &parameters)
        .await;

    let before = transport.writes(&a).await.len();
    let outcomes = session.turn_on(std::slice::from_ref(&a)).await;
    assert_eq!(outcomes[&a], SubmitOutcome::Applied);

    let writes = transport.writes(&a).await;
    let power_on =
        protocol::encode_power(ProtocolVariant::LegacyCombined, true).unwrap();
    let replay = protocol::encode(ProtocolVariant::LegacyCombined, &parameters).unwrap();
    assert_eq!(writes[before], power_on);
    assert_eq!(&writes[before + 1..], replay.as_slice());
}

#[tokio::test]
async fn manual_off_suppresses_restore_on_reconnect() {
    let (session, transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:0A").await;
    let parameters = LightParameters::cct(32, 30);
    session
        .set_parameters(std::slice::from_ref(&a), &parameters)
        .await;
    session.turn_off(std::slice::from_ref(&a)).await;
    session.disconnect(&a).await.unwrap();

    let before = transport.writes(&a).await.len();
    let mut events = session.subscribe();
    session.connect(&a).await.unwrap();
    wait_for_state(&mut events, &a, ConnectionState::Connected).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Only the status request goes out; the remembered parameters stay
    // parked until the operator turns the light back on.
    let status = protocol::encode_status_request(ProtocolVariant::LegacyCombined);
    let writes = transport.writes(&a).await;
    assert_eq!(&writes[before..], [status]);
}

#[tokio::test]
async fn reconnect_restores_parameters_when_not_manually_off() {
    let (session, transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:0B").await;
    let parameters = LightParameters::cct(32, 30);
    session
        .set_parameters(std::slice::from_ref(&a), &parameters)
        .await;
    session.disconnect(&a).await.unwrap();

    let before = transport.writes(&a).await.len();
    let mut events = session.subscribe();
    session.connect(&a).await.unwrap();
    wait_for_state(&mut events, &a, ConnectionState::Connected).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let restored = protocol::encode(ProtocolVariant::LegacyCombined, &parameters).unwrap();
    let writes = transport.writes(&a).await;
    assert_eq!(writes[before], restored[0]);
}

#[tokio::test]
async fn global_preset_recall_clamps_per_target() {
    let (session, transport) = session();
    let narrow = connect_light(&session, "NEEWER-SL90", "AA:0C").await;
    let wide = connect_light(&session, "NEEWER-Infinity TL60", "AA:0D").await;
    session
        .set_preferences(
            &wide,
            LightPreferences {
                custom_temperature_range: TemperatureRange::create(27, 100),
                ..LightPreferences::default()
            },
        )
        .await
        .unwrap();

    session
        .save_preset(1, PresetSaveMode::Global(LightParameters::cct(85, 50)))
        .await
        .unwrap();
    let outcomes = session
        .recall_preset(1, &[narrow.clone(), wide.clone()])
        .await
        .unwrap();
    assert_eq!(outcomes[&narrow], SubmitOutcome::Applied);
    assert_eq!(outcomes[&wide], SubmitOutcome::Applied);

    // Narrow fixture got the clamped 56; the wide one got 85 untouched.
    let clamped = protocol::encode(
        ProtocolVariant::LegacyCombined,
        &LightParameters::cct(56, 50),
    )
    .unwrap();
    assert_eq!(transport.writes(&narrow).await.last(), clamped.last());
    let untouched = protocol::encode(
        ProtocolVariant::InfinityStyle,
        &LightParameters::cct(85, 50),
    )
    .unwrap();
    assert_eq!(transport.writes(&wide).await.last(), untouched.last());

    // The stored preset itself keeps the original value.
    assert!(session.preset_is_custom(1).await.unwrap());
}

#[tokio::test]
async fn global_recall_clamps_to_wire_bounds_for_wide_custom_ranges() {
    let (session, transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:17").await;
    session
        .set_preferences(
            &a,
            LightPreferences {
                custom_temperature_range: TemperatureRange::create(56, 100),
                ..LightPreferences::default()
            },
        )
        .await
        .unwrap();

    session
        .save_preset(3, PresetSaveMode::Global(LightParameters::cct(100, 50)))
        .await
        .unwrap();
    let outcomes = session
        .recall_preset(3, std::slice::from_ref(&a))
        .await
        .unwrap();
    assert_eq!(outcomes[&a], SubmitOutcome::Applied);

    // The capability clamp leaves 100; the legacy wire maximum brings the
    // recalled value down to 85 instead of rejecting it.
    let expected = protocol::encode(
        ProtocolVariant::LegacyCombined,
        &LightParameters::cct(85, 50),
    )
    .unwrap();
    assert_eq!(transport.writes(&a).await.last(), expected.last());
}

#[tokio::test]
async fn write_exhaustion_disconnects_and_explicit_reconnect_recovers() {
    let (session, transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:18").await;

    let mut events = session.subscribe();
    transport.set_write_failure(&a, true).await;
    let outcomes = session
        .set_parameters(std::slice::from_ref(&a), &LightParameters::cct(56, 50))
        .await;
    assert_eq!(outcomes[&a], SubmitOutcome::Unreachable);
    wait_for_state(&mut events, &a, ConnectionState::Disconnected).await;

    // The teardown must leave the entity fully reconnectable: state
    // regressed and runtime entry released in one step.
    transport.set_write_failure(&a, false).await;
    session.connect(&a).await.unwrap();
    wait_for_state(&mut events, &a, ConnectionState::Connected).await;
    let outcomes = session
        .set_parameters(std::slice::from_ref(&a), &LightParameters::cct(56, 50))
        .await;
    assert_eq!(outcomes[&a], SubmitOutcome::Applied);
}

#[tokio::test]
async fn snapshot_recall_applies_captured_and_skips_the_rest() {
    let (session, _transport) = session();
    let x = connect_light(&session, "NEEWER-SL90", "AA:0E").await;
    let y = connect_light(&session, "NEEWER-SL60", "AA:0F").await;
    session
        .set_parameters(&[x.clone()], &LightParameters::cct(56, 50))
        .await;
    session
        .set_parameters(&[y.clone()], &LightParameters::hsi(0, 100, 20))
        .await;

    session.save_preset(8, PresetSaveMode::Snapshot).await.unwrap();

    // Y drops off before recall; Z was never captured.
    session.disconnect(&y).await.unwrap();
    let z = connect_light(&session, "NEEWER-SL80", "AA:10").await;

    let outcomes = session
        .recall_preset(8, &[x.clone(), y.clone(), z.clone()])
        .await
        .unwrap();
    assert_eq!(outcomes[&x], SubmitOutcome::Applied);
    assert_eq!(outcomes[&y], SubmitOutcome::Skipped);
    assert_eq!(outcomes[&z], SubmitOutcome::Skipped);
}

#[tokio::test]
async fn preset_reset_restores_the_builtin_default() {
    let (session, _transport) = session();
    session
        .save_preset(2, PresetSaveMode::Global(LightParameters::scene(3, 60)))
        .await
        .unwrap();
    assert!(session.preset_is_custom(2).await.unwrap());

    session.reset_preset(2).await.unwrap();
    assert!(!session.preset_is_custom(2).await.unwrap());

    assert!(matches!(
        session.reset_preset(9).await,
        Err(Error::InvalidSlot(9))
    ));
}

#[tokio::test]
async fn status_notifications_update_the_snapshot() {
    let (session, transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:11").await;
    let mut events = session.subscribe();

    // Power on, channel 5; checksum 0x81.
    transport.notify(&a, vec![120, 1, 2, 1, 5, 129]).await;

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(SessionEvent::StatusUpdated { address, status }) = events.recv().await {
                assert_eq!(address, a);
                assert!(status.power_on);
                assert_eq!(status.channel, 5);
                return;
            }
        }
    })
    .await
    .expect("status update never arrived");

    let snapshot = session.snapshot(&a).await.unwrap();
    let status = snapshot.power_and_channel.unwrap();
    assert!(status.power_on);
    assert_eq!(status.channel, 5);
}

#[tokio::test]
async fn malformed_notifications_are_discarded_not_fatal() {
    let (session, transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:12").await;

    // Corrupt checksum; the link must survive it.
    transport.notify(&a, vec![120, 1, 2, 1, 5, 0]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        session.snapshot(&a).await.unwrap().state,
        ConnectionState::Connected
    );
    let outcomes = session
        .set_parameters(std::slice::from_ref(&a), &LightParameters::cct(56, 50))
        .await;
    assert_eq!(outcomes[&a], SubmitOutcome::Applied);
}

#[tokio::test]
async fn remove_forgets_the_light_entirely() {
    let (session, _transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:13").await;

    session.remove(&a).await.unwrap();
    assert!(session.snapshot(&a).await.is_none());
    assert!(matches!(
        session.connect(&a).await,
        Err(Error::UnknownLight(_))
    ));
}

#[tokio::test]
async fn shutdown_disconnects_everything_but_keeps_entities() {
    let (session, _transport) = session();
    let a = connect_light(&session, "NEEWER-SL90", "AA:14").await;
    let b = connect_light(&session, "NEEWER-SL60", "AA:15").await;

    session.shutdown().await;

    for address in [&a, &b] {
        let snapshot = session.snapshot(address).await.unwrap();
        assert_eq!(snapshot.state, ConnectionState::Disconnected);
    }
}
