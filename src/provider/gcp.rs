pub mod artifact_registry;
pub mod iam;
pub mod projects;

pub use artifact_registry::RegistryDiscoverer;
pub use iam::ServiceAccountProvisioner;
pub use projects::ProjectEnumerator;
