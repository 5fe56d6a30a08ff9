mod default;
pub mod error;
pub mod factory;
pub mod hls_extractor;
pub mod json_path;
pub mod listing;
pub mod parser_data;
pub mod settings;
pub mod site_channel;
pub mod sites;
pub mod utils;

pub use default::{ProxyConfig, create_client, default_client, default_factory, factory_with_proxy};
