pub mod decision;
pub mod pagerduty;
