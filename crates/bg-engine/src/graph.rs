//! The mutable signal graph.
//!
//! Nodes live in a slotmap arena and render in topological order each
//! block: a node's input is the sum of every upstream node's output.
//! Wiring changes (effect add/remove, track teardown) re-derive the
//! order before the next block, so rebuild-from-scratch rewiring is
//! cheap and safe between blocks.
//!
//! All topology mutation happens on the engine thread, between renders;
//! there is no concurrent access to the arena.

use bg_ir::StereoBuffer;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::ramp::Ramp;

new_key_type! {
    /// Identifier for a node in the signal graph.
    pub struct NodeKey;
}

/// Gain applied at the master bus.
pub const MASTER_GAIN: f32 = 0.4;

/// Per-block render context handed to every node.
pub struct RenderCtx {
    pub sample_rate: u32,
    /// Absolute frame index of the first sample in this block.
    pub start_frame: u64,
    pub frames: usize,
}

/// A processing node in the signal graph.
///
/// `process` must overwrite every sample of `output`; `input` holds the
/// summed upstream signal (silence for source nodes).
pub trait AudioNode: Send {
    fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer, ctx: &RenderCtx);

    /// Set a named parameter, gliding over `ramp_secs`. Returns false
    /// if the parameter is unknown.
    fn set_param(&mut self, _name: &str, _value: f32, _ramp_secs: f32) -> bool {
        false
    }

    /// Current target value of a named parameter, if exposed.
    fn get_param(&self, _name: &str) -> Option<f32> {
        None
    }
}

struct Slot {
    node: Box<dyn AudioNode>,
    output: StereoBuffer,
}

/// Node arena plus wiring, rendered once per block.
pub struct AudioGraph {
    nodes: SlotMap<NodeKey, Slot>,
    /// Directed edges `(from, to)`.
    edges: Vec<(NodeKey, NodeKey)>,
    master: NodeKey,
    order: Vec<NodeKey>,
    order_dirty: bool,
    scratch: StereoBuffer,
    block_frames: usize,
    sample_rate: u32,
}

impl AudioGraph {
    /// Create a graph containing only the master gain node.
    pub fn new(sample_rate: u32, block_frames: usize) -> Self {
        let mut nodes: SlotMap<NodeKey, Slot> = SlotMap::with_key();
        let master = nodes.insert(Slot {
            node: Box::new(GainNode::new(MASTER_GAIN, sample_rate)),
            output: StereoBuffer::new(block_frames),
        });
        Self {
            nodes,
            edges: Vec::new(),
            master,
            order: vec![master],
            order_dirty: false,
            scratch: StereoBuffer::new(block_frames),
            block_frames,
            sample_rate,
        }
    }

    pub fn master(&self) -> NodeKey {
        self.master
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn block_frames(&self) -> usize {
        self.block_frames
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Add a node to the arena (initially unconnected).
    pub fn add(&mut self, node: Box<dyn AudioNode>) -> NodeKey {
        self.order_dirty = true;
        self.nodes.insert(Slot {
            node,
            output: StereoBuffer::new(self.block_frames),
        })
    }

    /// Remove a node and every edge touching it. No-op for the master
    /// node and for keys already removed.
    pub fn remove(&mut self, key: NodeKey) {
        if key == self.master || !self.nodes.contains_key(key) {
            return;
        }
        self.nodes.remove(key);
        self.edges.retain(|&(from, to)| from != key && to != key);
        self.order_dirty = true;
    }

    /// Connect `from` → `to`. Duplicate and dangling connects are no-ops.
    pub fn connect(&mut self, from: NodeKey, to: NodeKey) {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            return;
        }
        if self.edges.contains(&(from, to)) {
            return;
        }
        self.edges.push((from, to));
        self.order_dirty = true;
    }

    /// Drop every outgoing edge of `key`. Safe to call on nodes that
    /// are already fully disconnected or removed.
    pub fn disconnect_outputs(&mut self, key: NodeKey) {
        let before = self.edges.len();
        self.edges.retain(|&(from, _)| from != key);
        if self.edges.len() != before {
            self.order_dirty = true;
        }
    }

    /// True if an edge `from` → `to` exists.
    pub fn connected(&self, from: NodeKey, to: NodeKey) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Set a named parameter on a node. Returns false for missing
    /// nodes or unknown parameters.
    pub fn set_param(&mut self, key: NodeKey, name: &str, value: f32, ramp_secs: f32) -> bool {
        match self.nodes.get_mut(key) {
            Some(slot) => slot.node.set_param(name, value, ramp_secs),
            None => false,
        }
    }

    pub fn get_param(&self, key: NodeKey, name: &str) -> Option<f32> {
        self.nodes.get(key)?.node.get_param(name)
    }

    /// Render one block starting at absolute frame `start_frame`,
    /// returning the master bus output.
    pub fn render(&mut self, start_frame: u64) -> &StereoBuffer {
        if self.order_dirty {
            self.recompute_order();
        }
        let ctx = RenderCtx {
            sample_rate: self.sample_rate,
            start_frame,
            frames: self.block_frames,
        };

        for i in 0..self.order.len() {
            let key = self.order[i];

            self.scratch.silence();
            for &(from, to) in &self.edges {
                if to == key {
                    if let Some(upstream) = self.nodes.get(from) {
                        self.scratch.mix_from(&upstream.output);
                    }
                }
            }

            if let Some(slot) = self.nodes.get_mut(key) {
                slot.node.process(&self.scratch, &mut slot.output, &ctx);
            }
        }

        &self.nodes[self.master].output
    }

    /// Kahn's algorithm. Sources first, master last. A cycle would
    /// yield a partial order; our wiring never produces one.
    fn recompute_order(&mut self) {
        let mut in_degree: SecondaryMap<NodeKey, u32> = SecondaryMap::new();
        for key in self.nodes.keys() {
            in_degree.insert(key, 0);
        }
        for &(_, to) in &self.edges {
            if let Some(d) = in_degree.get_mut(to) {
                *d += 1;
            }
        }

        let mut queue: Vec<NodeKey> = self
            .nodes
            .keys()
            .filter(|&k| in_degree[k] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(key) = queue.pop() {
            order.push(key);
            for &(from, to) in &self.edges {
                if from == key {
                    if let Some(d) = in_degree.get_mut(to) {
                        *d -= 1;
                        if *d == 0 {
                            queue.push(to);
                        }
                    }
                }
            }
        }

        self.order = order;
        self.order_dirty = false;
    }
}

/// Multiplies its input by a smoothed gain value.
///
/// Used for the master bus, channel inputs/outputs (where the output
/// gain doubles as the track volume control), and effect bridges.
pub struct GainNode {
    gain: Ramp,
}

impl GainNode {
    pub fn new(gain: f32, sample_rate: u32) -> Self {
        Self {
            gain: Ramp::new(gain, sample_rate),
        }
    }
}

impl AudioNode for GainNode {
    fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer, _ctx: &RenderCtx) {
        let (left, right) = output.channels_mut();
        for i in 0..left.len() {
            let g = self.gain.next();
            left[i] = input.left()[i] * g;
            right[i] = input.right()[i] * g;
        }
    }

    fn set_param(&mut self, name: &str, value: f32, ramp_secs: f32) -> bool {
        if name == "gain" {
            self.gain.set_target(value, ramp_secs);
            true
        } else {
            false
        }
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        (name == "gain").then(|| self.gain.target())
    }
}
