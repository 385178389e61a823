//! On-disk synthetic datasets: bright square blobs on a dark background,
//! a manifest listing them and reference weight files.
use image::{GrayImage, Luma};
use protoseg::EvalConfig;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SIZE: u32 = 32;
const BRIGHT: u8 = 230;
const DARK: u8 = 25;

/// Square `(x, y, side)`.
pub type Blob = (u32, u32, u32);

/// One slice of the synthetic dataset.
#[derive(Clone, Debug)]
pub struct SliceSpec {
    pub case: String,
    pub segment: String,
    pub scan: String,
    pub slice: usize,
    /// Bright square drawn into the image.
    pub image_blob: Option<Blob>,
    /// Square written as the ground-truth mask.
    pub truth_blob: Option<Blob>,
}

impl SliceSpec {
    /// Slice whose ground truth matches the drawn blob.
    pub fn blob(case: &str, segment: &str, scan: &str, slice: usize, blob: Blob) -> Self {
        Self {
            case: case.to_string(),
            segment: segment.to_string(),
            scan: scan.to_string(),
            slice,
            image_blob: Some(blob),
            truth_blob: Some(blob),
        }
    }

    /// Uniformly dark slice with an empty ground truth.
    pub fn blank(case: &str, segment: &str, scan: &str, slice: usize) -> Self {
        Self {
            image_blob: None,
            truth_blob: None,
            ..Self::blob(case, segment, scan, slice, (0, 0, 0))
        }
    }

    pub fn with_truth(mut self, truth: Option<Blob>) -> Self {
        self.truth_blob = truth;
        self
    }

    fn stem(&self) -> String {
        format!("{}_{}_{}_{:04}", self.segment, self.case, self.scan, self.slice)
    }
}

fn inside(blob: Option<Blob>, x: u32, y: u32) -> bool {
    blob.is_some_and(|(bx, by, s)| x >= bx && x < bx + s && y >= by && y < by + s)
}

fn write_png(path: &Path, blob: Option<Blob>, on: u8, off: u8) {
    let img = GrayImage::from_fn(SIZE, SIZE, |x, y| {
        Luma([if inside(blob, x, y) { on } else { off }])
    });
    img.save(path).unwrap();
}

fn write_entries(dir: &Path, sub: &str, slices: &[SliceSpec]) -> Vec<serde_json::Value> {
    fs::create_dir_all(dir.join(sub)).unwrap();
    slices
        .iter()
        .map(|s| {
            let image = format!("{sub}/{}.png", s.stem());
            let mask = format!("{sub}/{}_mask.png", s.stem());
            write_png(&dir.join(&image), s.image_blob, BRIGHT, DARK);
            write_png(&dir.join(&mask), s.truth_blob, 255, 0);
            json!({
                "image": image,
                "mask": mask,
                "case": s.case,
                "segment": s.segment,
                "scan": s.scan,
                "slice": s.slice,
            })
        })
        .collect()
}

/// A dataset written to a temporary directory plus a config that evaluates
/// it with the reference backends.
pub struct Fixture {
    pub dir: TempDir,
    pub config: EvalConfig,
}

impl Fixture {
    pub fn new(support: &[SliceSpec], queries: &[SliceSpec]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let manifest = json!({
            "support": write_entries(dir.path(), "support", support),
            "queries": write_entries(dir.path(), "queries", queries),
        });
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, manifest.to_string()).unwrap();

        let coarse = dir.path().join("coarse.json");
        fs::write(&coarse, r#"{ "model": "intensity_prototype" }"#).unwrap();
        let refine = dir.path().join("refine.json");
        fs::write(&refine, r#"{ "model": "box_region" }"#).unwrap();

        let mut config = EvalConfig::default();
        config.dataset.manifest = manifest_path;
        config.coarse.weights = coarse;
        config.coarse.working_size = None;
        config.refine.weights = refine;
        config.refine.input_size = SIZE as usize;
        Self { dir, config }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }
}

/// Two segments, each with one support slice and a run of queries from
/// other scans, plus one query from a reserved scan and one blank query.
pub fn two_segment_dataset() -> Fixture {
    let support = [
        SliceSpec::blob("c0", "liver", "s0", 0, (4, 4, 10)),
        SliceSpec::blob("c0", "kidney", "s9", 0, (18, 16, 8)),
    ];
    let queries = [
        SliceSpec::blob("c0", "liver", "s0", 1, (6, 6, 9)),
        SliceSpec::blob("c1", "liver", "s1", 0, (8, 10, 9)),
        SliceSpec::blob("c1", "liver", "s1", 1, (12, 14, 7)),
        SliceSpec::blob("c1", "liver", "s1", 2, (3, 20, 8)),
        SliceSpec::blank("c1", "liver", "s1", 3),
        SliceSpec::blob("c2", "kidney", "s2", 0, (16, 4, 10)),
        SliceSpec::blob("c2", "kidney", "s2", 1, (20, 20, 6)),
        SliceSpec::blob("c2", "kidney", "s2", 2, (5, 9, 11)),
    ];
    Fixture::new(&support, &queries)
}
