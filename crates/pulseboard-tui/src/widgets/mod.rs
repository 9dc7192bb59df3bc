pub mod alert_popup;
pub mod status_indicator;
