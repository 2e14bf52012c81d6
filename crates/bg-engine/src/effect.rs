//! Effect node contract and the kind → factory registry.
//!
//! Effects come in two shapes: a self-contained [`EffectStage`] (one
//! processor boxed behind a bridge node), or a [`BuiltEffect::Composite`]
//! of several graph nodes wired by the factory. The channel rack treats
//! both as a single input/output pair when building a track's chain.

use std::collections::HashMap;
use std::sync::Arc;

use bg_ir::StereoBuffer;

use crate::graph::{AudioGraph, AudioNode, NodeKey, RenderCtx};

/// Declared range and default for one effect parameter.
#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

/// Static description of an effect kind.
#[derive(Clone, Copy, Debug)]
pub struct EffectInfo {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
}

impl EffectInfo {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// A self-contained effect processor.
pub trait EffectStage: Send {
    fn info(&self) -> EffectInfo;

    /// Process one block; must overwrite every sample of `output`.
    fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer, ctx: &RenderCtx);

    /// Set a named parameter, gliding over `ramp_secs`. Returns false
    /// if the parameter is unknown.
    fn set_param(&mut self, _name: &str, _value: f32, _ramp_secs: f32) -> bool {
        false
    }

    fn get_param(&self, _name: &str) -> Option<f32> {
        None
    }
}

/// Adapts an [`EffectStage`] into a graph node.
pub struct StageNode(pub Box<dyn EffectStage>);

impl AudioNode for StageNode {
    fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer, ctx: &RenderCtx) {
        self.0.process(input, output, ctx);
    }

    fn set_param(&mut self, name: &str, value: f32, ramp_secs: f32) -> bool {
        self.0.set_param(name, value, ramp_secs)
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        self.0.get_param(name)
    }
}

/// What a factory hands back to the channel rack.
pub enum BuiltEffect {
    /// One processor; the rack wraps it in a [`StageNode`].
    Stage(Box<dyn EffectStage>),
    /// A subgraph the factory wired itself.
    Composite {
        input: NodeKey,
        output: NodeKey,
        /// Every node the factory added, for teardown.
        nodes: Vec<NodeKey>,
        /// Named parameter taps: setting `name` forwards to the node.
        controls: Vec<(&'static str, NodeKey)>,
    },
}

/// Builds an instance of one effect kind.
pub trait EffectFactory: Send + Sync {
    fn build(&self, graph: &mut AudioGraph) -> BuiltEffect;
}

impl<F> EffectFactory for F
where
    F: Fn(&mut AudioGraph) -> BuiltEffect + Send + Sync,
{
    fn build(&self, graph: &mut AudioGraph) -> BuiltEffect {
        self(graph)
    }
}

/// Maps effect kind names to factories.
///
/// Unknown kinds surface as an error at dispatch, not a silent no-op.
#[derive(Default)]
pub struct EffectRegistry {
    factories: HashMap<String, Arc<dyn EffectFactory>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: impl EffectFactory + 'static) {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn EffectFactory>> {
        self.factories.get(kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
