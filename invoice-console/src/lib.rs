pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod services;
pub mod startup;

use std::sync::Arc;

use config::Settings;
use payments::{PaymentWorkflow, RefundCoordinator};
use services::{Notifier, Records};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub records: Records,
    pub workflow: PaymentWorkflow,
    pub refunds: RefundCoordinator,
    pub notifier: Notifier,
}

pub use startup::Application;
