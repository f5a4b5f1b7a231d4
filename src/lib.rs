// Library exports for quadraflow crate
// This allows tests and the binary to use the modules

pub mod case_number;
pub mod config;
pub mod console;
pub mod drive;
pub mod mail;
pub mod pipeline;
pub mod reconcile;
pub mod slack_notifier;
pub mod tracker;
