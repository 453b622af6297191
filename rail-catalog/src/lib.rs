pub mod registry;

pub use registry::{validate_train_request, RegistryError, TrainRegistry};
