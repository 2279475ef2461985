//! Genome-encoded decision networks.
//!
//! Weights are read straight out of the genome's `Weights(layer)` blocks.
//! Within a block, node `j` owns the contiguous run
//! `j * fan_in .. (j + 1) * fan_in`. There are no biases.

use serde::{Deserialize, Serialize};
use shared::{BlockKind, Genome, GenomeLayout};
use std::ops::Range;

/// Squashing function applied at every node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Tanh,
    /// `2 / (1 + e^(-2 s x)) - 1`, range (-1, 1).
    SigmoidSymmetric { steepness: f32 },
}

impl Activation {
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::SigmoidSymmetric { steepness } => {
                2.0 / (1.0 + (-2.0 * steepness * x).exp()) - 1.0
            }
        }
    }
}

/// Shape of the decision network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrainKind {
    /// Inputs wired straight to outputs.
    Perceptron,
    /// One or two hidden layers of the given widths.
    FeedForward { hidden: Vec<usize> },
}

/// Layer widths of a network, from inputs to outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub inputs: usize,
    pub hidden: Vec<usize>,
    pub outputs: usize,
}

impl Topology {
    pub fn new(kind: &BrainKind, inputs: usize, outputs: usize) -> Self {
        let hidden = match kind {
            BrainKind::Perceptron => Vec::new(),
            BrainKind::FeedForward { hidden } => hidden.clone(),
        };
        Self {
            inputs,
            hidden,
            outputs,
        }
    }

    /// `(fan_in, fan_out)` for each weight layer in evaluation order.
    pub fn layers(&self) -> Vec<(usize, usize)> {
        let widths: Vec<usize> = std::iter::once(self.inputs)
            .chain(self.hidden.iter().copied())
            .chain(std::iter::once(self.outputs))
            .collect();
        widths.windows(2).map(|w| (w[0], w[1])).collect()
    }

    pub fn weight_count(&self) -> usize {
        self.layers().iter().map(|(i, o)| i * o).sum()
    }
}

#[derive(Debug, Clone)]
struct Layer {
    fan_in: usize,
    fan_out: usize,
    genes: Range<usize>,
}

/// Evaluator bound to one genome layout. Holds no weights itself; every call
/// reads them from the genome passed in.
#[derive(Debug, Clone)]
pub struct Brain {
    layers: Vec<Layer>,
    activation: Activation,
    inputs: usize,
    outputs: usize,
}

impl Brain {
    pub fn new(topology: &Topology, layout: &GenomeLayout, activation: Activation) -> Self {
        let layers = topology
            .layers()
            .into_iter()
            .enumerate()
            .map(|(n, (fan_in, fan_out))| {
                let genes = layout.range(BlockKind::Weights(n));
                debug_assert!(
                    fan_in * fan_out == 0 || genes.len() == fan_in * fan_out,
                    "weight block {n} does not match the topology"
                );
                Layer {
                    fan_in,
                    fan_out,
                    genes,
                }
            })
            .collect();
        Self {
            layers,
            activation,
            inputs: topology.inputs,
            outputs: topology.outputs,
        }
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Run the network forward. Every output lies in `[-1, 1]`.
    pub fn evaluate(&self, genome: &Genome, inputs: &[f32]) -> Vec<f32> {
        debug_assert_eq!(inputs.len(), self.inputs);
        let mut values = inputs.to_vec();
        for layer in &self.layers {
            let weights = genome.block(layer.genes.clone());
            values = (0..layer.fan_out)
                .map(|j| {
                    let node = &weights[j * layer.fan_in..(j + 1) * layer.fan_in];
                    let sum: f32 = node.iter().zip(&values).map(|(w, x)| w * x).sum();
                    self.activation.apply(sum)
                })
                .collect();
        }
        values
    }
}
