//! Built-in effect stages.

mod delay;
mod reverb;

pub use delay::Delay;
pub use reverb::Reverb;

use crate::effect::{BuiltEffect, EffectRegistry};
use crate::graph::AudioGraph;

/// Registry with every built-in effect kind.
pub fn default_registry() -> EffectRegistry {
    let mut registry = EffectRegistry::new();
    registry.register("Delay", |graph: &mut AudioGraph| {
        BuiltEffect::Stage(Box::new(Delay::new(graph.sample_rate())))
    });
    registry.register("Reverb", |graph: &mut AudioGraph| {
        BuiltEffect::Stage(Box::new(Reverb::new(graph.sample_rate())))
    });
    registry
}
