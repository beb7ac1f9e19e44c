mod client;
pub mod container_registry;
pub mod dockerhub;
pub mod factory;
pub mod ghcr;
pub mod image_version;

pub use container_registry::{ContainerRegistry, RegistryError};
pub use dockerhub::DockerHubRegistry;
pub use factory::{RegistryKind, create_all_registries, create_registry};
pub use ghcr::GhcrRegistry;
pub use image_version::ImageVersion;
