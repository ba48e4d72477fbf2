// Networks Module
pub mod feature_extractor;
pub mod policy;

pub use feature_extractor::{FeatureExtractorConfig, MagicalCnn, BASE_CHANNELS};
pub use policy::BcPolicy;
