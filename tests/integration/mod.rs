//! Integration tests for the GrooveMate core

mod config_integration;
mod dispatcher_flow;
mod panel_flow;
mod storage_integration;
pub mod test_utils;
