pub mod discard;
pub mod file;
pub mod memory;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod registry;
pub mod stream;
#[cfg(feature = "network")]
pub mod tcp;

pub use discard::DiscardSink;
pub use file::FileSink;
pub use memory::MemorySink;
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttOptions, MqttProtocol, MqttSink, MqttSinkFactory};
pub use registry::{FileSinkFactory, SinkFactory, SinkRegistry};
pub use stream::{StdStream, StreamSink};
#[cfg(feature = "network")]
pub use tcp::{TcpOptions, TcpSink, TcpSinkFactory};
