pub mod books;
pub mod borrow;

use shelf_kernel::EndpointRegistry;

/// Register all lending API endpoints with the registry
pub fn register_all(registry: &mut EndpointRegistry) {
    books::register(registry);
    borrow::register(registry);
}

/// Registry holding every endpoint of the lending API.
pub fn registry() -> EndpointRegistry {
    let mut registry = EndpointRegistry::new();
    register_all(&mut registry);
    registry
}
