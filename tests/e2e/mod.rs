//! End-to-end tests for mjapp-client.
//!
//! Every test drives the public API against scripted stand-ins for Apple's
//! verifyReceipt endpoint and the backend; nothing touches the network.

mod harness;
mod purchase_flow;
mod receipt_flow;

pub use harness::{
    in_app, receipt_body, receipt_config, status_body, ScriptedTransport, TestHarness, BUNDLE_ID,
    RECEIPT_B64,
};
