//! HTTPS transport to the message broker and status classification.

mod https_broker;

pub use https_broker::{classify_send_error, classify_status, HttpsBrokerTransport};
