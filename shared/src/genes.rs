use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// Errors raised while building a genome or its layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenomeError {
    #[error("genome has {actual} genes but its layout expects {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("gene block {0:?} declared twice")]
    DuplicateBlock(BlockKind),

    #[error("gene block {0:?} is empty")]
    EmptyBlock(BlockKind),
}

/// What a contiguous run of genes is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Connection weights feeding network layer `n` (0 = first hidden or output layer).
    Weights(usize),
    /// One trigger threshold per behavior.
    Thresholds,
    /// Scaling applied to each memory write.
    MemoryScale,
    /// Memory values an agent starts its life with.
    MemorySeed,
}

/// A named, contiguous block inside a genome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneBlock {
    pub kind: BlockKind,
    pub offset: usize,
    pub len: usize,
}

impl GeneBlock {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Schema describing how a flat gene vector is partitioned.
///
/// Blocks are laid out in the order they are added. Every genome built
/// against a layout is checked for the exact length once, when it is
/// created, so consumers can slice blocks without re-validating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeLayout {
    blocks: Vec<GeneBlock>,
    len: usize,
}

impl GenomeLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block of `len` genes. Zero-length blocks are skipped so
    /// optional sections (e.g. memory with `memory_size == 0`) simply vanish.
    pub fn with_block(mut self, kind: BlockKind, len: usize) -> Result<Self, GenomeError> {
        if self.blocks.iter().any(|b| b.kind == kind) {
            return Err(GenomeError::DuplicateBlock(kind));
        }
        if len == 0 {
            return Ok(self);
        }
        self.blocks.push(GeneBlock {
            kind,
            offset: self.len,
            len,
        });
        self.len += len;
        Ok(self)
    }

    /// Total number of genes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn blocks(&self) -> &[GeneBlock] {
        &self.blocks
    }

    pub fn block(&self, kind: BlockKind) -> Option<&GeneBlock> {
        self.blocks.iter().find(|b| b.kind == kind)
    }

    /// Gene range for a block, or an empty range when the block is absent.
    pub fn range(&self, kind: BlockKind) -> Range<usize> {
        self.block(kind).map(GeneBlock::range).unwrap_or(0..0)
    }

    /// Block name for each gene position, used for labelling charts.
    pub fn gene_kinds(&self) -> Vec<BlockKind> {
        self.blocks
            .iter()
            .flat_map(|b| std::iter::repeat(b.kind).take(b.len))
            .collect()
    }
}

/// The heritable material of an agent: weights, thresholds and memory
/// parameters stored as one flat vector of floats.
///
/// A genome does not carry its layout; it is always created against one
/// (`random` / `from_genes`) and the length is checked there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    genes: Vec<f32>,
}

impl Genome {
    /// Create a genome with every gene drawn from a standard normal distribution.
    pub fn random<R: Rng + ?Sized>(layout: &GenomeLayout, rng: &mut R) -> Self {
        let genes = (0..layout.len()).map(|_| standard_normal(rng)).collect();
        Self { genes }
    }

    /// All-zero genome; placeholder for slots that have never been seeded.
    pub fn zeros(layout: &GenomeLayout) -> Self {
        Self {
            genes: vec![0.0; layout.len()],
        }
    }

    /// Wrap explicit gene values, checking them against the layout.
    pub fn from_genes(layout: &GenomeLayout, genes: Vec<f32>) -> Result<Self, GenomeError> {
        if genes.len() != layout.len() {
            return Err(GenomeError::LengthMismatch {
                expected: layout.len(),
                actual: genes.len(),
            });
        }
        Ok(Self { genes })
    }

    pub fn genes(&self) -> &[f32] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Slice out one block. Panics if the range lies outside the genome,
    /// which means the genome was built against a different layout.
    pub fn block(&self, range: Range<usize>) -> &[f32] {
        &self.genes[range]
    }

    /// Mutate genes in place: each gene is, with probability `rate`,
    /// replaced by `gene + N(0, 1) * scale`.
    ///
    /// Returns the positions that changed.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f32, scale: f32, rng: &mut R) -> Vec<usize> {
        let mut mutated = Vec::new();
        for (idx, gene) in self.genes.iter_mut().enumerate() {
            if rng.gen::<f32>() < rate {
                *gene += standard_normal(rng) * scale;
                mutated.push(idx);
            }
        }
        mutated
    }

    /// Sum of absolute gene values, used to normalise genome charts.
    pub fn magnitude(&self) -> f32 {
        self.genes.iter().map(|g| g.abs()).sum()
    }
}

/// Draw from N(0, 1) with the Box-Muller transform.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let u1: f32 = rng.gen::<f32>().max(f32::EPSILON);
    let u2: f32 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}
