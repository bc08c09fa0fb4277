//! MQTT publisher sink
//!
//! Destination form:
//! `mqtt://broker:1883?protocol=tcp&topic=logs&client_id=writer-1&qos=1&retained=false&sync=false`.
//!
//! `protocol` (`tcp`, `ws` or `wss`), `topic` and `client_id` are required.
//! Optional: `qos` (0, 1 or 2), `retained`, `sync` (wait for delivery on
//! every write), `user`, `password`, `timeout-ms` and `store`, a directory
//! that receives lines the client could not queue.
//!
//! Each encoded line becomes one message. The client's event loop runs on
//! its own thread and reconnects on its own after a lost connection.

use super::registry::SinkFactory;
use crate::core::{Dsn, LoggerError, Result, Sink};
use parking_lot::{Condvar, Mutex};
use rumqttc::{Client, Connection, Event, Outgoing, Packet, QoS, Transport};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const SCHEME: &str = "mqtt";
pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TIMEOUT_MS: i64 = 5000;

const REQUEST_CAPACITY: usize = 1024;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Transport used to reach the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttProtocol {
    Tcp,
    Ws,
    Wss,
}

impl MqttProtocol {
    pub const ALL: [MqttProtocol; 3] = [MqttProtocol::Tcp, MqttProtocol::Ws, MqttProtocol::Wss];

    pub fn as_str(&self) -> &'static str {
        match self {
            MqttProtocol::Tcp => "tcp",
            MqttProtocol::Ws => "ws",
            MqttProtocol::Wss => "wss",
        }
    }

    fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == value)
            .ok_or_else(|| LoggerError::invalid_parameter("protocol", value, "expected tcp, ws or wss"))
    }
}

/// Connection and publish options of an MQTT sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttOptions {
    pub protocol: MqttProtocol,
    pub host: String,
    pub port: u16,
    /// Path of the websocket endpoint, unused over plain TCP
    pub path: String,
    pub topic: String,
    pub client_id: String,
    pub qos: u8,
    pub retained: bool,
    pub sync: bool,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub store: Option<PathBuf>,
}

impl MqttOptions {
    pub fn new(
        host: impl Into<String>,
        topic: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            protocol: MqttProtocol::Tcp,
            host: host.into(),
            port: DEFAULT_PORT,
            path: String::new(),
            topic: topic.into(),
            client_id: client_id.into(),
            qos: 0,
            retained: false,
            sync: false,
            user: None,
            password: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS as u64),
            store: None,
        }
    }

    /// Read and validate options from an `mqtt://` destination
    ///
    /// Touches nothing on disk or on the network.
    pub fn from_dsn(dsn: &Dsn) -> Result<Self> {
        let url = dsn
            .url()
            .ok_or_else(|| LoggerError::destination(dsn.as_str(), "expected mqtt://host[:port]"))?;
        let host = url.host_str().unwrap_or_default();
        if host.is_empty() {
            return Err(LoggerError::missing_parameter(SCHEME, "host"));
        }

        let params = dsn.params();
        let protocol = match params.get("protocol") {
            Some(value) => MqttProtocol::parse(value)?,
            None => return Err(LoggerError::missing_parameter(SCHEME, "protocol")),
        };
        let topic = params
            .get("topic")
            .ok_or_else(|| LoggerError::missing_parameter(SCHEME, "topic"))?;
        let client_id = params
            .get("client_id")
            .ok_or_else(|| LoggerError::missing_parameter(SCHEME, "client_id"))?;
        if client_id.starts_with(char::is_whitespace) {
            return Err(LoggerError::invalid_parameter(
                "client_id",
                client_id,
                "must not start with whitespace",
            ));
        }

        let qos = params.int("qos", 0)?;
        if !(0..=2).contains(&qos) {
            return Err(LoggerError::invalid_parameter(
                "qos",
                qos.to_string(),
                "must be 0, 1 or 2",
            ));
        }

        let timeout_ms = params.int("timeout-ms", DEFAULT_TIMEOUT_MS)?;
        if timeout_ms <= 0 {
            return Err(LoggerError::invalid_parameter(
                "timeout-ms",
                timeout_ms.to_string(),
                "must be greater than zero",
            ));
        }

        Ok(Self {
            protocol,
            host: host.to_string(),
            port: url.port().unwrap_or(DEFAULT_PORT),
            path: url.path().trim_end_matches('/').to_string(),
            topic: topic.to_string(),
            client_id: client_id.to_string(),
            qos: qos as u8,
            retained: params.bool("retained", false)?,
            sync: params.bool("sync", false)?,
            user: params.get("user").map(str::to_string),
            password: params.get("password").map(str::to_string),
            timeout: Duration::from_millis(timeout_ms as u64),
            store: params.get("store").map(PathBuf::from),
        })
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: MqttProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos;
        self
    }

    #[must_use]
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: impl Into<PathBuf>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// `protocol://host:port`
    pub fn broker(&self) -> String {
        format!("{}://{}:{}", self.protocol.as_str(), self.host, self.port)
    }

    fn quality(&self) -> Result<QoS> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(LoggerError::invalid_parameter(
                "qos",
                other.to_string(),
                "must be 0, 1 or 2",
            )),
        }
    }

    fn client_options(&self) -> rumqttc::MqttOptions {
        let mut options = match self.protocol {
            MqttProtocol::Tcp => rumqttc::MqttOptions::new(&self.client_id, &self.host, self.port),
            // Websocket transports take the full endpoint URL as the host.
            MqttProtocol::Ws | MqttProtocol::Wss => rumqttc::MqttOptions::new(
                &self.client_id,
                format!("{}{}", self.broker(), self.path),
                self.port,
            ),
        };
        options.set_keep_alive(KEEP_ALIVE);
        if let Some(user) = &self.user {
            options.set_credentials(user, self.password.clone().unwrap_or_default());
        }
        match self.protocol {
            MqttProtocol::Tcp => options.set_transport(Transport::Tcp),
            MqttProtocol::Ws => options.set_transport(Transport::Ws),
            MqttProtocol::Wss => options.set_transport(Transport::wss_with_default_config()),
        };
        options
    }
}

/// Create the store directory, or check that an existing one is usable
pub fn prepare_store(store: &Path) -> Result<()> {
    match fs::metadata(store) {
        Ok(meta) if !meta.is_dir() => Err(LoggerError::invalid_parameter(
            "store",
            store.display().to_string(),
            "not a directory",
        )),
        Ok(meta) if meta.permissions().readonly() => Err(LoggerError::invalid_parameter(
            "store",
            store.display().to_string(),
            "directory is not writable",
        )),
        Ok(_) => Ok(()),
        Err(_) => {
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o770);
            }
            builder.create(store).map_err(|e| {
                LoggerError::io_operation(
                    "creating MQTT store",
                    format!("cannot create {}", store.display()),
                    e,
                )
            })
        }
    }
}

/// Publish bookkeeping shared with the event loop thread
#[derive(Default)]
struct Delivery {
    queued: u64,
    delivered: u64,
    /// First connection outcome; `None` until the broker answers or fails
    connection: Option<std::result::Result<(), String>>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<Delivery>,
    changed: Condvar,
    closed: AtomicBool,
}

impl Shared {
    fn update(&self, f: impl FnOnce(&mut Delivery)) {
        f(&mut self.state.lock());
        self.changed.notify_all();
    }

    /// Wait until `count` messages were delivered; false on timeout
    fn wait_delivered(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.delivered < count {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return state.delivered >= count;
            }
        }
        true
    }

    fn wait_connected(&self, timeout: Duration) -> Option<std::result::Result<(), String>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.connection.is_none() {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.connection.clone()
    }
}

/// Sink publishing every line to an MQTT topic
///
/// # Example
///
/// ```no_run
/// use rust_log_writer::sinks::mqtt::{MqttOptions, MqttSink};
/// use rust_log_writer::core::Sink;
///
/// let sink = MqttSink::connect(MqttOptions::new("127.0.0.1", "logs", "writer-1"))
///     .expect("Failed to connect to broker");
/// sink.write(b"hello\n").unwrap();
/// sink.close().unwrap();
/// ```
pub struct MqttSink {
    options: MqttOptions,
    name: String,
    qos: QoS,
    client: Mutex<Client>,
    shared: Arc<Shared>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttSink {
    /// Connect to the broker and wait for its acknowledgement
    ///
    /// # Errors
    ///
    /// Returns error if the options are invalid, the store directory is
    /// unusable, or the broker does not accept the connection within the
    /// timeout
    pub fn connect(options: MqttOptions) -> Result<Self> {
        let qos = options.quality()?;
        if options.client_id.is_empty() || options.client_id.starts_with(char::is_whitespace) {
            return Err(LoggerError::invalid_parameter(
                "client_id",
                &options.client_id,
                "must be non-empty and not start with whitespace",
            ));
        }
        if let Some(store) = &options.store {
            prepare_store(store)?;
        }

        let (client, connection) = Client::new(options.client_options(), REQUEST_CAPACITY);
        let shared = Arc::new(Shared::default());
        let name = format!("{}/{}", options.broker(), options.topic);

        let event_loop = {
            let shared = Arc::clone(&shared);
            let name = name.clone();
            thread::Builder::new()
                .name("mqtt-sink".to_string())
                .spawn(move || run_event_loop(connection, shared, qos, name))?
        };

        let sink = Self {
            name,
            qos,
            client: Mutex::new(client),
            shared,
            event_loop: Mutex::new(Some(event_loop)),
            options,
        };

        match sink.shared.wait_connected(sink.options.timeout) {
            Some(Ok(())) => Ok(sink),
            Some(Err(message)) => Err(LoggerError::writer(format!(
                "Failed to connect to {}: {}",
                sink.options.broker(),
                message
            ))),
            None => Err(LoggerError::writer(format!(
                "Failed to connect to {}: no answer within {:?}",
                sink.options.broker(),
                sink.options.timeout
            ))),
        }
    }

    pub fn options(&self) -> &MqttOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Messages handed to the client so far
    pub fn queued(&self) -> u64 {
        self.shared.state.lock().queued
    }

    /// Messages the broker confirmed (or, at QoS 0, that were sent)
    pub fn delivered(&self) -> u64 {
        self.shared.state.lock().delivered
    }

    fn undelivered_path(&self) -> Option<PathBuf> {
        self.options
            .store
            .as_ref()
            .map(|store| store.join(format!("{}.undelivered", self.options.client_id)))
    }

    /// Keep a line the client refused
    fn spill(&self, bytes: &[u8]) {
        let Some(path) = self.undelivered_path() else {
            return;
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(bytes));
        if let Err(e) = result {
            eprintln!(
                "[LOGGER WARNING] Failed to store undelivered line in {}: {}",
                path.display(),
                e
            );
        }
    }
}

impl Sink for MqttSink {
    fn write(&self, bytes: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(LoggerError::sink_closed(&self.name));
        }

        let ticket = {
            let client = self.client.lock();
            let topic = self.options.topic.clone();
            let payload = bytes.to_vec();
            let published = if self.options.sync {
                client.publish(topic, self.qos, self.options.retained, payload)
            } else {
                client.try_publish(topic, self.qos, self.options.retained, payload)
            };

            if let Err(e) = published {
                self.spill(bytes);
                return Err(LoggerError::writer(format!(
                    "Failed to publish to {}: {}",
                    self.name, e
                )));
            }

            let mut state = self.shared.state.lock();
            state.queued += 1;
            state.queued
        };

        if self.options.sync && !self.shared.wait_delivered(ticket, self.options.timeout) {
            return Err(LoggerError::writer(format!(
                "Publish to {} not confirmed within {:?}",
                self.name, self.options.timeout
            )));
        }
        Ok(bytes.len())
    }

    /// Wait until every queued message was delivered
    fn sync(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        let queued = self.queued();
        if self.shared.wait_delivered(queued, self.options.timeout) {
            Ok(())
        } else {
            Err(LoggerError::writer(format!(
                "{} of {} messages to {} still unconfirmed",
                queued - self.delivered().min(queued),
                queued,
                self.name
            )))
        }
    }

    fn close(&self) -> Result<()> {
        let Some(handle) = self.event_loop.lock().take() else {
            return Ok(());
        };

        let pending = self.sync();
        let disconnected = {
            let client = self.client.lock();
            self.shared.closed.store(true, Ordering::Release);
            client.disconnect()
        };
        if let Err(e) = disconnected {
            eprintln!("[LOGGER WARNING] Failed to disconnect from {}: {}", self.name, e);
        }
        if handle.join().is_err() {
            eprintln!("[LOGGER ERROR] MQTT event loop for {} panicked", self.name);
        }
        pending
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MqttSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn run_event_loop(mut connection: Connection, shared: Arc<Shared>, qos: QoS, name: String) {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => shared.update(|state| {
                state.connection.get_or_insert(Ok(()));
            }),
            Ok(Event::Outgoing(Outgoing::Publish(_))) if qos == QoS::AtMostOnce => {
                shared.update(|state| state.delivered += 1)
            }
            Ok(Event::Incoming(Packet::PubAck(_))) if qos == QoS::AtLeastOnce => {
                shared.update(|state| state.delivered += 1)
            }
            Ok(Event::Incoming(Packet::PubComp(_))) if qos == QoS::ExactlyOnce => {
                shared.update(|state| state.delivered += 1)
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(e) => {
                if shared.closed.load(Ordering::Acquire) {
                    break;
                }
                let mut first = false;
                shared.update(|state| {
                    if state.connection.is_none() {
                        state.connection = Some(Err(e.to_string()));
                        first = true;
                    }
                });
                if first {
                    // Nobody is waiting for a sink that never connected.
                    break;
                }
                eprintln!("[LOGGER WARNING] MQTT connection for {} failed: {}", name, e);
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
}

/// Factory for `mqtt://` destinations
#[derive(Debug, Default, Clone, Copy)]
pub struct MqttSinkFactory;

impl SinkFactory for MqttSinkFactory {
    fn validate(&self, dsn: &Dsn) -> Result<()> {
        MqttOptions::from_dsn(dsn).map(|_| ())
    }

    fn open(&self, dsn: &Dsn) -> Result<Arc<dyn Sink>> {
        Ok(Arc::new(MqttSink::connect(MqttOptions::from_dsn(dsn)?)?))
    }
}
