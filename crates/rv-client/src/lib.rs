//! RV Client
//!
//! Topic clients that turn rosbridge messages into scene content:
//!
//! - [`ros`] - Sans-IO rosbridge connection handle and topic subscriptions
//! - [`tf`] - Frame transform sources and frame-tracking scene nodes
//! - [`client::HeightMapClient`] - Displays the latest height map of a topic
//! - [`config`] - RON viewer configuration

pub mod client;
pub mod config;
pub mod events;
pub mod ros;
pub mod tf;

pub use client::{ClientError, HeightMapClient, HeightMapClientOptions};
pub use config::{ConfigError, ConfigManager, ViewerConfig};
pub use events::{ClientEvent, EventEmitter};
pub use ros::{Compression, Ros, RosError, Topic};
pub use tf::{SceneNode, TfBuffer, TfClient};
