pub mod settings;

pub use settings::{EngineSettings, RsiSettings, WaveTrendSettings};
