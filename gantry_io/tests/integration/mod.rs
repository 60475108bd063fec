mod common;

mod config_build;
mod dispatch;
mod heartbeat;
mod interlocks;
mod properties;
mod replay;
mod settings;
