//! Engine configuration.

mod engine_desc;

pub use engine_desc::BeaconEngineDesc;
