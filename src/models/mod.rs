//! Model components: classifiers, scalers, persistence and training

pub mod artifact;
pub mod calibration;
pub mod classifier;
pub mod fallback;
pub mod forest;
pub mod inference;
pub mod loader;
pub mod scaler;
pub mod trainer;

pub use classifier::{Classifier, ClassifierArtifact};
pub use fallback::RuleBasedClassifier;
pub use inference::{Inference, InferenceEngine};
pub use loader::{ModelContext, ModelLoader, ModelSource};
pub use scaler::{FeatureScaler, IdentityScaler, StandardScaler};
pub use trainer::{Dataset, TrainedModel, Trainer};
