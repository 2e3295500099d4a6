//! Factories for generating instances of trackfetch modules.

pub mod core_consumer;
pub use core_consumer::CoreConsumerFactory;

pub mod mem_transport;
pub use mem_transport::MemTransport;

pub mod mem_producer;
pub use mem_producer::MemProducer;
