use super::{SupportExample, SupportPool, SupportSet};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Support examples grouped by segment identifier.
#[derive(Clone, Debug, Default)]
pub struct GroupedSupportPool {
    sets: BTreeMap<String, Arc<SupportSet>>,
    reserved: HashSet<String>,
}

impl GroupedSupportPool {
    /// Group `examples` by segment, keeping at most `max_per_segment` of each
    /// (in input order). Scans of the kept examples become reserved.
    pub fn from_examples(examples: Vec<SupportExample>, max_per_segment: usize) -> Self {
        let cap = max_per_segment.max(1);
        let mut grouped: BTreeMap<String, Vec<SupportExample>> = BTreeMap::new();
        for ex in examples {
            let bucket = grouped.entry(ex.segment.clone()).or_default();
            if bucket.len() < cap {
                bucket.push(ex);
            }
        }
        let reserved = grouped
            .values()
            .flatten()
            .map(|ex| ex.scan.clone())
            .collect();
        let sets = grouped
            .into_iter()
            .map(|(segment, examples)| {
                let set = Arc::new(SupportSet::new(segment.clone(), examples));
                (segment, set)
            })
            .collect();
        Self { sets, reserved }
    }
}

impl SupportPool for GroupedSupportPool {
    fn get_support_set(&self, segment: &str) -> Option<Arc<SupportSet>> {
        self.sets.get(segment).cloned()
    }

    fn is_reserved(&self, scan: &str) -> bool {
        self.reserved.contains(scan)
    }
}

/// One global support set used for every segment.
///
/// Typical when the support examples come from a separate training
/// collection, so no test scan needs to be reserved.
#[derive(Clone, Debug)]
pub struct FixedSupportPool {
    set: Arc<SupportSet>,
    reserved: HashSet<String>,
}

impl FixedSupportPool {
    pub fn new(examples: Vec<SupportExample>) -> Self {
        Self {
            set: Arc::new(SupportSet::new("*", examples)),
            reserved: HashSet::new(),
        }
    }

    pub fn with_reserved_scans(mut self, scans: impl IntoIterator<Item = String>) -> Self {
        self.reserved.extend(scans);
        self
    }
}

impl SupportPool for FixedSupportPool {
    fn get_support_set(&self, _segment: &str) -> Option<Arc<SupportSet>> {
        Some(Arc::clone(&self.set))
    }

    fn is_reserved(&self, scan: &str) -> bool {
        self.reserved.contains(scan)
    }
}
