pub mod alert;
pub mod api;
pub mod config;
pub mod db;
pub mod ledger;
pub mod monitor;
pub mod retry;
pub mod runway;
pub mod scheduler;
pub mod snapshot;
pub mod units;
