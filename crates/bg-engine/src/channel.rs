//! Per-track channel strips and effect chain wiring.
//!
//! Every track owns an input gain node (where voices land) and an
//! output gain node (which doubles as the volume/mute/solo control)
//! feeding the master bus. Effects sit between the two; any chain edit
//! rewires the whole strip from scratch rather than patching edges,
//! which keeps ordering bugs out at the cost of a few redundant
//! connects.

use std::collections::HashMap;

use bg_ir::{EffectId, TrackId};
use log::debug;

use crate::effect::{BuiltEffect, EffectFactory, StageNode};
use crate::graph::{AudioGraph, GainNode, NodeKey};
use crate::ramp::PARAM_SMOOTH_SECS;

/// Graph footprint of one instantiated effect.
pub struct EffectHandle {
    input: NodeKey,
    output: NodeKey,
    nodes: Vec<NodeKey>,
    controls: Vec<(&'static str, NodeKey)>,
    /// Set when the effect is a single stage node; parameters go
    /// straight to it.
    stage: Option<NodeKey>,
}

/// One track's strip: input gain, effect chain, output gain.
pub struct TrackChannel {
    input: NodeKey,
    output: NodeKey,
    effects: Vec<(EffectId, EffectHandle)>,
}

impl TrackChannel {
    pub fn input(&self) -> NodeKey {
        self.input
    }

    pub fn output(&self) -> NodeKey {
        self.output
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    fn handle(&self, effect: EffectId) -> Option<&EffectHandle> {
        self.effects.iter().find(|(id, _)| *id == effect).map(|(_, h)| h)
    }
}

/// All track channels, keyed by track id.
#[derive(Default)]
pub struct ChannelRack {
    channels: HashMap<TrackId, TrackChannel>,
}

impl ChannelRack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, track: TrackId) -> Option<&TrackChannel> {
        self.channels.get(&track)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Get a track's channel, creating and wiring it on first use.
    ///
    /// `initial_gain` seeds the output gain so a brand-new channel for
    /// a muted or quiet track never ramps down from full volume.
    pub fn ensure(
        &mut self,
        graph: &mut AudioGraph,
        track: TrackId,
        initial_gain: f32,
    ) -> &TrackChannel {
        self.channels.entry(track).or_insert_with(|| {
            let sr = graph.sample_rate();
            let input = graph.add(Box::new(GainNode::new(1.0, sr)));
            let output = graph.add(Box::new(GainNode::new(initial_gain, sr)));
            graph.connect(input, output);
            graph.connect(output, graph.master());
            debug!("created channel for track {track}");
            TrackChannel { input, output, effects: Vec::new() }
        })
    }

    /// Instantiate an effect on a track and rewire its chain to match
    /// `order` (the track's full effect id list, including the new one).
    pub fn apply_effect(
        &mut self,
        graph: &mut AudioGraph,
        track: TrackId,
        effect: EffectId,
        factory: &dyn EffectFactory,
        order: &[EffectId],
    ) {
        self.ensure(graph, track, 1.0);
        let handle = match factory.build(graph) {
            BuiltEffect::Stage(stage) => {
                let key = graph.add(Box::new(StageNode(stage)));
                EffectHandle {
                    input: key,
                    output: key,
                    nodes: vec![key],
                    controls: Vec::new(),
                    stage: Some(key),
                }
            }
            BuiltEffect::Composite { input, output, nodes, controls } => {
                EffectHandle { input, output, nodes, controls, stage: None }
            }
        };
        let channel = self
            .channels
            .get_mut(&track)
            .expect("channel exists after ensure");
        channel.effects.push((effect, handle));
        self.rebuild(graph, track, order);
    }

    /// Tear down an effect's nodes and rewire the remaining chain.
    /// No-op if the track or effect is unknown.
    pub fn remove_effect(
        &mut self,
        graph: &mut AudioGraph,
        track: TrackId,
        effect: EffectId,
        order: &[EffectId],
    ) {
        let Some(channel) = self.channels.get_mut(&track) else {
            return;
        };
        let Some(idx) = channel.effects.iter().position(|(id, _)| *id == effect) else {
            return;
        };
        let (_, handle) = channel.effects.remove(idx);
        for node in handle.nodes {
            graph.remove(node);
        }
        self.rebuild(graph, track, order);
    }

    /// Rewire a track's strip from scratch: input → effects in `order`
    /// → output. Effects present in the channel but absent from
    /// `order` are left connected to nothing.
    pub fn rebuild(&mut self, graph: &mut AudioGraph, track: TrackId, order: &[EffectId]) {
        let Some(channel) = self.channels.get(&track) else {
            return;
        };

        graph.disconnect_outputs(channel.input);
        for (_, handle) in &channel.effects {
            graph.disconnect_outputs(handle.output);
        }

        let mut current = channel.input;
        for id in order {
            let Some(handle) = channel.handle(*id) else {
                continue;
            };
            graph.connect(current, handle.input);
            current = handle.output;
        }
        graph.connect(current, channel.output);
        debug!("rebuilt chain for track {track}: {} effect(s)", order.len());
    }

    /// Forward a parameter change to an effect. Unknown targets are
    /// ignored; returns whether anything accepted the value.
    pub fn update_param(
        &mut self,
        graph: &mut AudioGraph,
        track: TrackId,
        effect: EffectId,
        name: &str,
        value: f32,
    ) -> bool {
        let Some(handle) = self.channels.get(&track).and_then(|c| c.handle(effect)) else {
            debug!("param change for unknown effect {effect} on track {track}");
            return false;
        };
        if let Some(stage) = handle.stage {
            return graph.set_param(stage, name, value, PARAM_SMOOTH_SECS);
        }
        if let Some(&(_, node)) = handle.controls.iter().find(|(n, _)| *n == name) {
            return graph.set_param(node, name, value, PARAM_SMOOTH_SECS);
        }
        false
    }

    /// Set the track's output gain, smoothed.
    pub fn set_track_gain(&self, graph: &mut AudioGraph, track: TrackId, gain: f32) {
        if let Some(channel) = self.channels.get(&track) {
            graph.set_param(channel.output, "gain", gain, PARAM_SMOOTH_SECS);
        }
    }

    /// Remove a track's entire strip from the graph. Idempotent.
    pub fn remove_track(&mut self, graph: &mut AudioGraph, track: TrackId) {
        let Some(channel) = self.channels.remove(&track) else {
            return;
        };
        for (_, handle) in channel.effects {
            for node in handle.nodes {
                graph.remove(node);
            }
        }
        graph.remove(channel.input);
        graph.remove(channel.output);
        debug!("removed channel for track {track}");
    }

    /// Tear down every channel.
    pub fn reset(&mut self, graph: &mut AudioGraph) {
        let tracks: Vec<TrackId> = self.channels.keys().copied().collect();
        for track in tracks {
            self.remove_track(graph, track);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::default_registry;

    fn setup() -> (AudioGraph, ChannelRack) {
        (AudioGraph::new(44100, 64), ChannelRack::new())
    }

    #[test]
    fn ensure_wires_input_through_output_to_master() {
        let (mut graph, mut rack) = setup();
        rack.ensure(&mut graph, 1, 1.0);
        let channel = rack.get(1).unwrap();
        assert!(graph.connected(channel.input(), channel.output()));
        assert!(graph.connected(channel.output(), graph.master()));
    }

    #[test]
    fn ensure_is_idempotent() {
        let (mut graph, mut rack) = setup();
        rack.ensure(&mut graph, 1, 1.0);
        let nodes = graph.node_count();
        rack.ensure(&mut graph, 1, 1.0);
        assert_eq!(graph.node_count(), nodes);
        assert_eq!(rack.len(), 1);
    }

    #[test]
    fn applied_effect_sits_between_input_and_output() {
        let (mut graph, mut rack) = setup();
        let registry = default_registry();
        let delay = registry.get("Delay").unwrap();
        rack.apply_effect(&mut graph, 1, 10, delay.as_ref(), &[10]);

        let channel = rack.get(1).unwrap();
        assert_eq!(channel.effect_count(), 1);
        assert!(!graph.connected(channel.input(), channel.output()));
        let handle = channel.handle(10).unwrap();
        assert!(graph.connected(channel.input(), handle.input));
        assert!(graph.connected(handle.output, channel.output()));
    }

    #[test]
    fn chain_follows_external_order() {
        let (mut graph, mut rack) = setup();
        let registry = default_registry();
        let delay = registry.get("Delay").unwrap();
        let reverb = registry.get("Reverb").unwrap();
        rack.apply_effect(&mut graph, 1, 10, delay.as_ref(), &[10]);
        rack.apply_effect(&mut graph, 1, 20, reverb.as_ref(), &[10, 20]);

        let channel = rack.get(1).unwrap();
        let a = channel.handle(10).unwrap().output;
        let b = channel.handle(20).unwrap().input;
        assert!(graph.connected(a, b));

        // Reversing the order rewires the chain the other way round.
        rack.rebuild(&mut graph, 1, &[20, 10]);
        let channel = rack.get(1).unwrap();
        let delay_in = channel.handle(10).unwrap().input;
        let reverb_out = channel.handle(20).unwrap().output;
        assert!(graph.connected(channel.input(), channel.handle(20).unwrap().input));
        assert!(graph.connected(reverb_out, delay_in));
        assert!(graph.connected(channel.handle(10).unwrap().output, channel.output()));
    }

    #[test]
    fn removing_middle_effect_relinks_neighbors() {
        let (mut graph, mut rack) = setup();
        let registry = default_registry();
        let delay = registry.get("Delay").unwrap();
        rack.apply_effect(&mut graph, 1, 10, delay.as_ref(), &[10]);
        rack.apply_effect(&mut graph, 1, 20, delay.as_ref(), &[10, 20]);
        rack.apply_effect(&mut graph, 1, 30, delay.as_ref(), &[10, 20, 30]);

        rack.remove_effect(&mut graph, 1, 20, &[10, 30]);
        let channel = rack.get(1).unwrap();
        assert_eq!(channel.effect_count(), 2);
        let a_out = channel.handle(10).unwrap().output;
        let c_in = channel.handle(30).unwrap().input;
        assert!(graph.connected(a_out, c_in));
    }

    #[test]
    fn removing_last_effect_restores_passthrough() {
        let (mut graph, mut rack) = setup();
        let registry = default_registry();
        let delay = registry.get("Delay").unwrap();
        rack.apply_effect(&mut graph, 1, 10, delay.as_ref(), &[10]);
        let nodes_with_effect = graph.node_count();
        rack.remove_effect(&mut graph, 1, 10, &[]);

        let channel = rack.get(1).unwrap();
        assert!(graph.connected(channel.input(), channel.output()));
        assert_eq!(graph.node_count(), nodes_with_effect - 1);
    }

    #[test]
    fn rebuild_is_idempotent_and_leaves_no_duplicate_edges() {
        let (mut graph, mut rack) = setup();
        let registry = default_registry();
        let delay = registry.get("Delay").unwrap();
        rack.apply_effect(&mut graph, 1, 10, delay.as_ref(), &[10]);
        let edges = graph.edge_count();
        rack.rebuild(&mut graph, 1, &[10]);
        rack.rebuild(&mut graph, 1, &[10]);
        assert_eq!(graph.edge_count(), edges);
    }

    #[test]
    fn update_param_reaches_stage_effects() {
        let (mut graph, mut rack) = setup();
        let registry = default_registry();
        let delay = registry.get("Delay").unwrap();
        rack.apply_effect(&mut graph, 1, 10, delay.as_ref(), &[10]);

        assert!(rack.update_param(&mut graph, 1, 10, "wet", 0.3));
        let stage = rack.get(1).unwrap().handle(10).unwrap().stage.unwrap();
        assert_eq!(graph.get_param(stage, "wet"), Some(0.3));

        // Unknown effect and unknown parameter are both ignored.
        assert!(!rack.update_param(&mut graph, 1, 99, "wet", 0.3));
        assert!(!rack.update_param(&mut graph, 1, 10, "size", 0.3));
    }

    #[test]
    fn remove_track_tears_down_all_nodes() {
        let (mut graph, mut rack) = setup();
        let registry = default_registry();
        let delay = registry.get("Delay").unwrap();
        rack.apply_effect(&mut graph, 1, 10, delay.as_ref(), &[10]);

        let baseline = 1; // master only
        rack.remove_track(&mut graph, 1);
        assert_eq!(graph.node_count(), baseline);
        assert_eq!(graph.edge_count(), 0);
        assert!(rack.get(1).is_none());

        // Deleting again must not fail.
        rack.remove_track(&mut graph, 1);
    }

    #[test]
    fn reset_clears_every_channel() {
        let (mut graph, mut rack) = setup();
        rack.ensure(&mut graph, 1, 1.0);
        rack.ensure(&mut graph, 2, 1.0);
        rack.reset(&mut graph);
        assert!(rack.is_empty());
        assert_eq!(graph.node_count(), 1);
    }
}
