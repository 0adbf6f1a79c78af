//! Job-graph construction.
//!
//! The rendering service accepts a workflow as a map of node IDs to typed
//! nodes. Each node input is either a literal JSON value or a link to
//! another node's output slot, serialized as `["<node_id>", <slot>]`.
//! [`build_graph`] produces the Flux schnell text-to-image workflow for a
//! single [`JobDescriptor`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::descriptor::JobDescriptor;
use crate::error::CoreError;

/// Reference to output slot `.1` of node `.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLink(pub String, pub u32);

/// A single node input binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeInput {
    Link(NodeLink),
    Literal(serde_json::Value),
}

impl NodeInput {
    fn link(node_id: &str, slot: u32) -> Self {
        NodeInput::Link(NodeLink(node_id.to_string(), slot))
    }

    fn literal(value: impl Into<serde_json::Value>) -> Self {
        NodeInput::Literal(value.into())
    }
}

/// A typed node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub class_type: String,
    pub inputs: BTreeMap<String, NodeInput>,
}

impl GraphNode {
    fn new<const N: usize>(class_type: &str, inputs: [(&str, NodeInput); N]) -> Self {
        Self {
            class_type: class_type.to_string(),
            inputs: inputs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// A complete workflow, keyed by node ID.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobGraph {
    nodes: BTreeMap<String, GraphNode>,
}

impl JobGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, id: &str, node: GraphNode) {
        self.nodes.insert(id.to_string(), node);
    }
}

// Node IDs within the workflow.
const UNET: &str = "1";
const CLIP: &str = "2";
const POSITIVE: &str = "3";
const NEGATIVE: &str = "4";
const LATENT: &str = "5";
const SAMPLER: &str = "6";
const VAE: &str = "7";
const DECODE: &str = "8";
const SAVE: &str = "9";

/// Build the text-to-image workflow for `descriptor`.
///
/// Validates the descriptor first; the seed and both prompt strings are
/// embedded as literals in the sampler and conditioning nodes.
pub fn build_graph(descriptor: &JobDescriptor) -> Result<JobGraph, CoreError> {
    descriptor.validate()?;
    let s = &descriptor.sampling;

    let mut graph = JobGraph::default();

    graph.insert(
        UNET,
        GraphNode::new(
            "UnetLoaderGGUF",
            [("unet_name", NodeInput::literal(s.unet_name.as_str()))],
        ),
    );
    graph.insert(
        CLIP,
        GraphNode::new(
            "DualCLIPLoaderGGUF",
            [
                ("clip_name1", NodeInput::literal(s.clip_name1.as_str())),
                ("clip_name2", NodeInput::literal(s.clip_name2.as_str())),
                ("type", NodeInput::literal("flux")),
            ],
        ),
    );
    graph.insert(
        POSITIVE,
        GraphNode::new(
            "CLIPTextEncodeFlux",
            [
                ("clip", NodeInput::link(CLIP, 0)),
                ("clip_l", NodeInput::literal(descriptor.clip_prompt.as_str())),
                ("t5xxl", NodeInput::literal(descriptor.t5_prompt.as_str())),
                ("guidance", NodeInput::literal(s.guidance)),
            ],
        ),
    );
    graph.insert(
        NEGATIVE,
        GraphNode::new(
            "CLIPTextEncodeFlux",
            [
                ("clip", NodeInput::link(CLIP, 0)),
                ("clip_l", NodeInput::literal("")),
                ("t5xxl", NodeInput::literal("")),
                ("guidance", NodeInput::literal(s.guidance)),
            ],
        ),
    );
    graph.insert(
        LATENT,
        GraphNode::new(
            "EmptySD3LatentImage",
            [
                ("width", NodeInput::literal(s.width)),
                ("height", NodeInput::literal(s.height)),
                ("batch_size", NodeInput::literal(1)),
            ],
        ),
    );
    graph.insert(
        SAMPLER,
        GraphNode::new(
            "KSampler",
            [
                ("model", NodeInput::link(UNET, 0)),
                ("seed", NodeInput::literal(descriptor.seed)),
                ("steps", NodeInput::literal(s.steps)),
                ("cfg", NodeInput::literal(s.cfg)),
                ("sampler_name", NodeInput::literal(s.sampler_name.as_str())),
                ("scheduler", NodeInput::literal(s.scheduler.as_str())),
                ("positive", NodeInput::link(POSITIVE, 0)),
                ("negative", NodeInput::link(NEGATIVE, 0)),
                ("latent_image", NodeInput::link(LATENT, 0)),
                ("denoise", NodeInput::literal(s.denoise)),
            ],
        ),
    );
    graph.insert(
        VAE,
        GraphNode::new(
            "VAELoader",
            [("vae_name", NodeInput::literal(s.vae_name.as_str()))],
        ),
    );
    graph.insert(
        DECODE,
        GraphNode::new(
            "VAEDecode",
            [
                ("samples", NodeInput::link(SAMPLER, 0)),
                ("vae", NodeInput::link(VAE, 0)),
            ],
        ),
    );
    graph.insert(
        SAVE,
        GraphNode::new(
            "SaveImage",
            [
                ("images", NodeInput::link(DECODE, 0)),
                ("filename_prefix", NodeInput::literal(descriptor.name.as_str())),
            ],
        ),
    );

    Ok(graph)
}
