use super::QuerySample;
use crate::config::{DatasetConfig, SupportMode};
use crate::error::{EvalError, Result};
use crate::image::io::{load_image, load_mask};
use crate::support::{FixedSupportPool, GroupedSupportPool, SupportExample, SupportPool};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One image/mask pair listed in a manifest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub image: PathBuf,
    pub mask: PathBuf,
    pub case: String,
    pub segment: String,
    pub scan: String,
    #[serde(default)]
    pub slice: usize,
}

/// JSON listing of query and support entries.
///
/// Relative paths resolve against `root`, which itself defaults to the
/// manifest's directory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub root: Option<PathBuf>,
    pub support: Vec<ManifestEntry>,
    pub queries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        let mut manifest: Manifest = serde_json::from_str(&data).map_err(|e| {
            EvalError::InvalidConfig(format!("failed to parse manifest {}: {e}", path.display()))
        })?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        manifest.root = Some(match manifest.root.take() {
            Some(root) if root.is_relative() => base.join(root),
            Some(root) => root,
            None => base,
        });
        debug!(
            "manifest {}: {} support, {} queries",
            path.display(),
            manifest.support.len(),
            manifest.queries.len()
        );
        Ok(manifest)
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        match &self.root {
            Some(root) if p.is_relative() => root.join(p),
            _ => p.to_path_buf(),
        }
    }

    fn load_pair(&self, entry: &ManifestEntry, grayscale: bool) -> Result<QuerySample> {
        let image = load_image(&self.resolve(&entry.image), grayscale)?;
        let mask = load_mask(&self.resolve(&entry.mask))?;
        QuerySample::new(
            image,
            mask,
            entry.case.clone(),
            entry.segment.clone(),
            entry.scan.clone(),
            entry.slice,
        )
    }

    /// Decode every support entry.
    pub fn support_examples(&self, grayscale: bool) -> Result<Vec<SupportExample>> {
        self.support
            .iter()
            .map(|entry| {
                let s = self.load_pair(entry, grayscale)?;
                Ok(SupportExample {
                    image: s.image,
                    mask: s.ground_truth,
                    segment: s.segment,
                    case: s.case,
                    scan: s.scan,
                })
            })
            .collect()
    }

    /// Support pool over the manifest's support entries.
    pub fn support_pool(&self, cfg: &DatasetConfig) -> Result<Arc<dyn SupportPool>> {
        let examples = self.support_examples(cfg.grayscale)?;
        let pool: Arc<dyn SupportPool> = match cfg.support_mode {
            SupportMode::PerSegment => Arc::new(GroupedSupportPool::from_examples(
                examples,
                cfg.max_support_per_segment,
            )),
            SupportMode::Fixed => {
                let scans: Vec<String> = examples.iter().map(|e| e.scan.clone()).collect();
                Arc::new(FixedSupportPool::new(examples).with_reserved_scans(scans))
            }
        };
        Ok(pool)
    }

    /// Lazily decoded query samples in manifest order.
    pub fn queries(&self, grayscale: bool) -> impl Iterator<Item = Result<QuerySample>> + '_ {
        self.queries
            .iter()
            .map(move |entry| self.load_pair(entry, grayscale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::io::save_mask;
    use crate::image::Mask;

    #[test]
    fn entries_resolve_against_the_manifest_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mask = Mask::from_fn(6, 4, |x, _| x < 2);
        save_mask(&mask, &dir.path().join("data/q.png")).unwrap();
        let json = r#"{
            "root": "data",
            "support": [
                { "image": "q.png", "mask": "q.png", "case": "c1", "segment": "c1:0", "scan": "s1" }
            ],
            "queries": [
                { "image": "q.png", "mask": "q.png", "case": "c2", "segment": "c2:0", "scan": "s2", "slice": 3 }
            ]
        }"#;
        let path = dir.path().join("manifest.json");
        fs::write(&path, json).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        let support = manifest.support_examples(true).unwrap();
        assert_eq!(support.len(), 1);
        assert_eq!(support[0].mask, mask);

        let queries: Vec<_> = manifest.queries(true).collect::<Result<_>>().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].slice, 3);
        assert_eq!(queries[0].image.channels, 1);
        assert_eq!(queries[0].label(), "c2_s2_0003");
    }

    #[test]
    fn missing_query_file_surfaces_as_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(
            &path,
            r#"{ "queries": [ { "image": "nope.png", "mask": "nope.png", "case": "c", "segment": "s", "scan": "x" } ] }"#,
        )
        .unwrap();
        let manifest = Manifest::load(&path).unwrap();
        let first = manifest.queries(false).next().unwrap();
        assert!(matches!(first, Err(EvalError::Io { .. })));
    }
}
