//! UI layer for desktop GUI: the fraud check window and its widgets.

pub mod app;

pub use app::FraudCheckApp;
