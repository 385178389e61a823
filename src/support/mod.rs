//! Support-set bookkeeping for the few-shot coarse segmenter.
//!
//! Overview
//! - A [`SupportPool`] owns every labelled reference example, grouped by
//!   segment identifier (a sub-range of a scan), and knows which scans were
//!   drawn into the pool.
//! - The [`SupportSetManager`] is a two-state machine, `Unbound` or
//!   `Bound(segment)`. [`bind`](SupportSetManager::bind) is its only
//!   transition: the same segment returns the bound set untouched, a new
//!   segment swaps the whole active set.
//! - Scans reserved as support must not be scored as queries;
//!   [`is_reserved`](SupportSetManager::is_reserved) exposes that to the driver.
//!
//! A pool with a single global set ([`FixedSupportPool`]) goes through exactly
//! the same manager; every bind simply resolves to the same shared set.

mod pool;

pub use pool::{FixedSupportPool, GroupedSupportPool};

use crate::error::{EvalError, Result};
use crate::image::{ImageF32, Mask};
use log::debug;
use std::sync::Arc;

/// One labelled reference example.
#[derive(Clone, Debug)]
pub struct SupportExample {
    pub image: ImageF32,
    pub mask: Mask,
    pub segment: String,
    /// Case the example was drawn from.
    pub case: String,
    /// Scan the example was drawn from; reserved from scoring.
    pub scan: String,
}

/// The examples bound to one segment.
#[derive(Clone, Debug, Default)]
pub struct SupportSet {
    pub segment: String,
    pub examples: Vec<SupportExample>,
}

impl SupportSet {
    pub fn new(segment: impl Into<String>, examples: Vec<SupportExample>) -> Self {
        Self {
            segment: segment.into(),
            examples,
        }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageF32> + '_ {
        self.examples.iter().map(|e| &e.image)
    }

    pub fn masks(&self) -> impl Iterator<Item = &Mask> + '_ {
        self.examples.iter().map(|e| &e.mask)
    }
}

/// Source of support examples.
pub trait SupportPool: Send + Sync {
    /// Shared support set registered for `segment`, `None` when unknown.
    fn get_support_set(&self, segment: &str) -> Option<Arc<SupportSet>>;

    /// True for scans whose examples were drawn into the pool.
    fn is_reserved(&self, scan: &str) -> bool;
}

#[derive(Clone, Debug, Default)]
enum BindState {
    #[default]
    Unbound,
    Bound {
        segment: String,
        set: Arc<SupportSet>,
    },
}

/// Tracks the active support set as the query stream crosses segments.
pub struct SupportSetManager {
    pool: Arc<dyn SupportPool>,
    state: BindState,
    rotations: usize,
}

impl SupportSetManager {
    pub fn new(pool: Arc<dyn SupportPool>) -> Self {
        Self {
            pool,
            state: BindState::Unbound,
            rotations: 0,
        }
    }

    /// Active set for `segment`, rotating it if the segment changed.
    ///
    /// Fails with [`EvalError::UnboundSegment`] when the pool has nothing for
    /// `segment`; the previously bound set stays active in that case.
    pub fn bind(&mut self, segment: &str) -> Result<Arc<SupportSet>> {
        if let BindState::Bound { segment: bound, set } = &self.state {
            if bound == segment {
                return Ok(Arc::clone(set));
            }
        }

        let set = self
            .pool
            .get_support_set(segment)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EvalError::UnboundSegment {
                segment: segment.to_string(),
            })?;

        let replaced = match &self.state {
            BindState::Unbound => true,
            BindState::Bound { set: prev, .. } => !Arc::ptr_eq(prev, &set),
        };
        if replaced {
            self.rotations += 1;
            debug!(
                "SupportSetManager: bound segment '{}' ({} examples)",
                segment,
                set.len()
            );
        }
        self.state = BindState::Bound {
            segment: segment.to_string(),
            set: Arc::clone(&set),
        };
        Ok(set)
    }

    pub fn is_reserved(&self, scan: &str) -> bool {
        self.pool.is_reserved(scan)
    }

    /// Segment of the most recent successful bind.
    pub fn active_segment(&self) -> Option<&str> {
        match &self.state {
            BindState::Unbound => None,
            BindState::Bound { segment, .. } => Some(segment),
        }
    }

    /// Number of times the active set content was replaced.
    pub fn rotations(&self) -> usize {
        self.rotations
    }
}
