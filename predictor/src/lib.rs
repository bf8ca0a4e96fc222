pub mod artifact;
pub mod error;
pub mod identity;
pub mod idmap;
pub mod scoring;

mod params;
mod predictor;

pub use artifact::load_predictor;
pub use error::{LoadErr, PredictErr};
pub use identity::ArtifactIdentity;
pub use idmap::IdMap;
pub use predictor::Predictor;
pub use scoring::{Geometry, Variant};
