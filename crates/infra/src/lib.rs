pub mod config;
pub mod live;
pub mod logging;
pub mod observability;
pub mod realtime;
pub mod repositories;
