//! Infrastructure services

mod model_gateway;

pub use model_gateway::{ModelGateway, ModelGatewayBuilder, ProviderModels, parse_json_content};
