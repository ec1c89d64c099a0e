pub mod endpoint;
pub mod registry;
pub mod settings;

pub use endpoint::{
    Endpoint, EndpointDescriptor, EndpointError, EndpointKind, Method, RequestSpec, Tag,
};
pub use registry::EndpointRegistry;
pub use settings::Settings;
