pub mod indicator_service;

pub use indicator_service::{replay_concurrently, IndicatorService, PairKey, PairPipeline};
