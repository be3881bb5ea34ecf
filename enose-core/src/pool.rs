//! Ordered set of base classifiers sharing one input

use std::collections::HashSet;

use crossbeam_utils::thread;

use crate::assembler::{LayoutEntry, MetaLayout};
use crate::error::{EnoseError, EnoseResult, ScoreError};
use crate::model::{Capability, ClassifierHandle, Scored};
use crate::types::ScaledReading;

/// One named member of the pool
#[derive(Debug)]
pub struct PoolMember {
    pub name: String,
    pub handle: ClassifierHandle,
}

impl PoolMember {
    fn output(&self, result: Result<Scored, ScoreError>) -> EnoseResult<BaseOutput> {
        result
            .map(|scored| BaseOutput::new(&self.name, self.handle.capability(), scored))
            .map_err(|e| EnoseError::inference(&self.name, e))
    }
}

/// Result of one base model on one reading
#[derive(Debug, Clone, PartialEq)]
pub struct BaseOutput {
    pub name: String,
    pub capability: Capability,
    /// Probabilities or decision scores, one per class
    pub scores: Vec<f64>,
    /// Position of the winning class within `scores`
    pub position: usize,
    pub class_index: usize,
}

impl BaseOutput {
    fn new(name: &str, capability: Capability, scored: Scored) -> Self {
        Self {
            name: name.to_string(),
            capability,
            scores: scored.scores,
            position: scored.position,
            class_index: scored.class_index,
        }
    }

    /// Probability of the winning class; `None` for scoring models
    pub fn probability(&self) -> Option<f64> {
        match self.capability {
            Capability::Probabilistic => self.scores.get(self.position).copied(),
            Capability::Scoring => None,
        }
    }
}

/// Base models in registration order. The order is part of the contract:
/// it fixes both the meta-feature layout and the response order.
#[derive(Debug)]
pub struct BaseModelPool {
    members: Vec<PoolMember>,
    parallel: bool,
}

impl BaseModelPool {
    /// Builds a pool, rejecting an empty set or duplicate names
    pub fn new(members: Vec<(String, ClassifierHandle)>) -> EnoseResult<Self> {
        if members.is_empty() {
            return Err(EnoseError::Config("base model pool is empty".into()));
        }

        let mut seen = HashSet::new();
        for (name, _) in &members {
            if !seen.insert(name.as_str()) {
                return Err(EnoseError::Config(format!(
                    "base model '{}' registered twice",
                    name
                )));
            }
        }

        let members = members
            .into_iter()
            .map(|(name, handle)| PoolMember { name, handle })
            .collect();

        Ok(Self {
            members,
            parallel: false,
        })
    }

    /// Scores members on scoped threads instead of one after another
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn members(&self) -> &[PoolMember] {
        &self.members
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `(name, width)` per member, in registration order
    pub fn layout(&self) -> MetaLayout {
        MetaLayout::new(
            self.members
                .iter()
                .map(|m| LayoutEntry::new(&m.name, m.handle.width()))
                .collect(),
        )
    }

    /// Runs every member on the reading.
    ///
    /// Output order equals registration order. Any failure aborts the whole
    /// call; when several members fail, the earliest registered one is reported.
    pub fn infer(&self, reading: &ScaledReading) -> EnoseResult<Vec<BaseOutput>> {
        let x = reading.values();

        if self.parallel && self.members.len() > 1 {
            return self
                .members
                .iter()
                .zip(self.score_parallel(x))
                .map(|(member, result)| member.output(result))
                .collect();
        }

        // stops at the first failing member
        self.members
            .iter()
            .map(|member| member.output(member.handle.score(x)))
            .collect()
    }

    fn score_parallel(&self, x: &[f64]) -> Vec<Result<Scored, ScoreError>> {
        let joined = thread::scope(|s| {
            let handles: Vec<_> = self
                .members
                .iter()
                .map(|m| s.spawn(move |_| m.handle.score(x)))
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(ScoreError::Corrupt("model panicked while scoring".into()))
                    })
                })
                .collect::<Vec<_>>()
        });

        joined.unwrap_or_else(|_| {
            self.members
                .iter()
                .map(|_| Err(ScoreError::Corrupt("scoring scope panicked".into())))
                .collect()
        })
    }
}
