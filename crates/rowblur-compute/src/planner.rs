//! Row partition planner.
//!
//! Runs on the coordinator only. Every rank gets the same number of rows,
//! `height / workers`, and the same number of plane bytes,
//! `width * height / workers`. Both divisions truncate: rows past
//! `workers * row_span` and the last `plane_len % workers` bytes belong to
//! nobody and come out of the pipeline unfiltered.

use std::ops::Range;

use crate::{ComputeError, ComputeResult};

/// What one rank is told about its share of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionMetadata {
    /// Rows per rank.
    pub row_span: u32,
    /// First row owned by the rank.
    pub start_row: u32,
    /// One past the last row owned by the rank.
    pub end_row: u32,
    /// Bytes of each color plane owned by the rank.
    pub element_count: usize,
    /// Image width, needed by the kernel on ranks that never decode.
    pub width: u32,
    /// Image height, needed by the kernel on ranks that never decode.
    pub height: u32,
}

impl PartitionMetadata {
    /// Rows owned by the rank.
    pub fn rows(&self) -> Range<u32> {
        self.start_row..self.end_row
    }
}

/// Partitions for every rank, rank 0 first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// One entry per rank.
    pub partitions: Vec<PartitionMetadata>,
}

impl PartitionPlan {
    /// Number of ranks.
    pub fn workers(&self) -> usize {
        self.partitions.len()
    }

    /// Partition of `rank`.
    pub fn for_rank(&self, rank: usize) -> Option<&PartitionMetadata> {
        self.partitions.get(rank)
    }

    /// Bytes per rank per plane.
    pub fn element_count(&self) -> usize {
        self.partitions.first().map_or(0, |p| p.element_count)
    }

    /// Length of one color plane.
    pub fn plane_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Rows no partition covers.
    pub fn uncovered_rows(&self) -> Range<u32> {
        let covered = self.partitions.last().map_or(0, |p| p.end_row);
        covered..self.height
    }

    /// Plane bytes no partition covers.
    pub fn uncovered_bytes(&self) -> usize {
        self.plane_len() - self.element_count() * self.workers()
    }

    /// True when every row and every byte has an owner.
    pub fn is_exact(&self) -> bool {
        self.uncovered_rows().is_empty() && self.uncovered_bytes() == 0
    }
}

/// Partition planner.
#[derive(Debug, Clone)]
pub struct Planner {
    workers: usize,
}

impl Planner {
    /// Planner for a fixed number of ranks.
    pub fn new(workers: usize) -> ComputeResult<Self> {
        if workers == 0 {
            return Err(ComputeError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(Self { workers })
    }

    /// Number of ranks planned for.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Plan partitions for a `width` x `height` image.
    pub fn plan(&self, width: u32, height: u32) -> PartitionPlan {
        let n = self.workers;
        let row_span = (height as usize / n) as u32;
        let element_count = width as usize * height as usize / n;

        let partitions = (0..n)
            .map(|rank| {
                let start_row = rank as u32 * row_span;
                PartitionMetadata {
                    row_span,
                    start_row,
                    end_row: start_row + row_span,
                    element_count,
                    width,
                    height,
                }
            })
            .collect();

        PartitionPlan {
            width,
            height,
            partitions,
        }
    }

    /// Human-readable plan summary.
    pub fn describe(&self, plan: &PartitionPlan) -> String {
        let mut desc = String::new();

        desc.push_str(&format!("Image: {}x{}\n", plan.width, plan.height));
        desc.push_str(&format!("Workers: {}\n", plan.workers()));
        desc.push_str(&format!("Bytes per plane per rank: {}\n", plan.element_count()));
        for (rank, p) in plan.partitions.iter().enumerate() {
            desc.push_str(&format!(
                "  rank {}: rows {}..{}\n",
                rank, p.start_row, p.end_row
            ));
        }

        let rows = plan.uncovered_rows();
        if !rows.is_empty() {
            desc.push_str(&format!("Unfiltered rows: {}..{}\n", rows.start, rows.end));
        }
        if plan.uncovered_bytes() > 0 {
            desc.push_str(&format!(
                "Unfiltered bytes per plane: {}\n",
                plan.uncovered_bytes()
            ));
        }

        desc
    }
}
