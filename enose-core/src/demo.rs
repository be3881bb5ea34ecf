//! Reference artifact set for the eight-channel bench rig
//!
//! Builds a small, fully deterministic ensemble around one prototype reading
//! per class. It backs `enose init`, the benches and the test suites, and is
//! what ships under `artifacts/`.

use std::path::Path;

use crate::artifacts::write_json;
use crate::assembler::{LayoutEntry, MetaLayout};
use crate::codec::LabelParams;
use crate::config::EnsembleConfig;
use crate::error::{EnoseError, EnoseResult};
use crate::meta::MetaArtifact;
use crate::model::{
    Activation, DenseLayer, GradientBoosting, KNearestNeighbors, KnnWeights, LogisticRegression,
    Mlp, ModelArtifact, MultiClass, RandomForest, Tree, TreeNode,
};
use crate::scaler::ScalerParams;
use crate::types::SensorReading;

/// Class names in index order
pub const LABELS: [&str; 5] = [
    "Thịt loại 1",
    "Thịt loại 2",
    "Thịt loại 3",
    "Thịt loại 4",
    "Thịt hỏng",
];

/// Raw prototype per class over MQ2, MQ3, MQ4, MQ6, MQ7, MQ135, TEMP, HUMI
pub const PROTOTYPES: [[f64; 8]; 5] = [
    [420.0, 1210.0, 530.0, 1180.0, 690.0, 1020.0, 29.0, 61.0],
    [560.0, 1650.0, 710.0, 1620.0, 930.0, 1400.0, 31.0, 65.0],
    [690.0, 2080.0, 880.0, 2060.0, 1180.0, 1780.0, 33.0, 68.0],
    [815.0, 2530.0, 1075.0, 2510.0, 1435.0, 2160.0, 36.0, 72.0],
    [1050.0, 3300.0, 1400.0, 3250.0, 1900.0, 2850.0, 38.0, 78.0],
];

/// Relative offsets used to spread stored neighbours around each prototype
const JITTER: [f64; 4] = [-0.02, -0.01, 0.01, 0.02];

/// Half-width of a boosted tree's "near the prototype" band, in scaled units
const BAND: f64 = 0.5;

/// Registration order, matching the meta model's training order
pub const BASE_ORDER: [&str; 4] = ["random_forest", "xgboost", "knn", "ann"];

/// Every artifact of the reference ensemble
#[derive(Debug, Clone)]
pub struct DemoSet {
    pub scaler: ScalerParams,
    pub labels: LabelParams,
    /// `(name, artifact)` in [`BASE_ORDER`]
    pub base: Vec<(String, ModelArtifact)>,
    pub meta: MetaArtifact,
}

/// The prototype reading of `class`
pub fn sample_reading(class: usize) -> Option<SensorReading> {
    PROTOTYPES.get(class).map(|p| SensorReading::new(p.to_vec()))
}

pub fn build() -> DemoSet {
    let scaler = fit_scaler();
    let scaled: Vec<Vec<f64>> = PROTOTYPES
        .iter()
        .map(|p| scale(&scaler, p))
        .collect();
    let classes: Vec<usize> = (0..LABELS.len()).collect();

    let base = vec![
        (BASE_ORDER[0].to_string(), random_forest(&classes, &scaled)),
        (BASE_ORDER[1].to_string(), boosted(&classes, &scaled)),
        (BASE_ORDER[2].to_string(), knn(&classes, &scaler)),
        (BASE_ORDER[3].to_string(), ann(&classes, &scaled)),
    ];
    let meta = meta(&classes, &base);

    DemoSet {
        scaler,
        labels: LabelParams {
            classes: LABELS.iter().map(|l| l.to_string()).collect(),
        },
        base,
        meta,
    }
}

/// Writes the reference set plus an `enose.toml` into `dir`
pub fn write(dir: &Path) -> EnoseResult<EnsembleConfig> {
    std::fs::create_dir_all(dir).map_err(|e| EnoseError::artifact(dir, e))?;

    let set = build();
    let config = EnsembleConfig::in_dir(dir);

    write_json(&config.artifact_path(&config.scaler), &set.scaler)?;
    write_json(&config.artifact_path(&config.labels), &set.labels)?;
    write_json(&config.artifact_path(&config.meta), &set.meta)?;
    for ((_, artifact), entry) in set.base.iter().zip(&config.base_models) {
        write_json(&config.artifact_path(&entry.artifact), artifact)?;
    }

    let on_disk = EnsembleConfig {
        artifact_dir: ".".into(),
        ..config.clone()
    };
    let toml_path = dir.join("enose.toml");
    std::fs::write(&toml_path, on_disk.to_toml()?)
        .map_err(|e| EnoseError::artifact(&toml_path, e))?;

    Ok(config)
}

fn fit_scaler() -> ScalerParams {
    let n = PROTOTYPES.len() as f64;
    let width = PROTOTYPES[0].len();

    let mean: Vec<f64> = (0..width)
        .map(|c| PROTOTYPES.iter().map(|p| p[c]).sum::<f64>() / n)
        .collect();
    let scale = (0..width)
        .map(|c| {
            let var = PROTOTYPES
                .iter()
                .map(|p| (p[c] - mean[c]).powi(2))
                .sum::<f64>()
                / n;
            var.sqrt()
        })
        .collect();

    ScalerParams { mean, scale }
}

fn scale(scaler: &ScalerParams, raw: &[f64]) -> Vec<f64> {
    raw.iter()
        .zip(scaler.mean.iter().zip(&scaler.scale))
        .map(|(x, (m, s))| (x - m) / s)
        .collect()
}

/// One tree per channel: a chain of splits at the midpoints between
/// neighbouring prototypes, each leaf voting mostly for its class
fn random_forest(classes: &[usize], scaled: &[Vec<f64>]) -> ModelArtifact {
    let k = classes.len();
    let trees = (0..scaled[0].len())
        .map(|f| {
            let mut order: Vec<usize> = (0..k).collect();
            order.sort_by(|&a, &b| scaled[a][f].total_cmp(&scaled[b][f]));

            let mut nodes = Vec::with_capacity(2 * k - 1);
            for (i, pair) in order.windows(2).enumerate() {
                let threshold = (scaled[pair[0]][f] + scaled[pair[1]][f]) / 2.0;
                let split = nodes.len();
                nodes.push(TreeNode::Split {
                    feature: f,
                    threshold,
                    left: split + 1,
                    right: split + 2,
                });
                nodes.push(TreeNode::Leaf {
                    value: vote(k, pair[0]),
                });
                if i == k - 2 {
                    nodes.push(TreeNode::Leaf {
                        value: vote(k, pair[1]),
                    });
                }
            }
            Tree { nodes }
        })
        .collect();

    ModelArtifact::RandomForest(RandomForest {
        classes: classes.to_vec(),
        n_features: scaled[0].len(),
        trees,
    })
}

/// Leaf sample counts: 8 for the class, 1 for each neighbour
fn vote(k: usize, class: usize) -> Vec<f64> {
    (0..k)
        .map(|c| match c.abs_diff(class) {
            0 => 8.0,
            1 => 1.0,
            _ => 0.0,
        })
        .collect()
}

/// One round per channel; class `c`'s tree rewards readings inside a band
/// around its prototype
fn boosted(classes: &[usize], scaled: &[Vec<f64>]) -> ModelArtifact {
    let k = classes.len();
    let mut trees = Vec::with_capacity(scaled[0].len() * k);
    for f in 0..scaled[0].len() {
        for class in 0..k {
            let center = scaled[class][f];
            trees.push(Tree {
                nodes: vec![
                    TreeNode::Split {
                        feature: f,
                        threshold: center - BAND,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: vec![-0.4] },
                    TreeNode::Split {
                        feature: f,
                        threshold: center + BAND,
                        left: 3,
                        right: 4,
                    },
                    TreeNode::Leaf { value: vec![0.6] },
                    TreeNode::Leaf { value: vec![-0.4] },
                ],
            });
        }
    }

    ModelArtifact::GradientBoosting(GradientBoosting {
        classes: classes.to_vec(),
        n_features: scaled[0].len(),
        base_score: 0.5,
        trees,
    })
}

/// Prototypes plus jittered copies, stored in scaled space
fn knn(classes: &[usize], scaler: &ScalerParams) -> ModelArtifact {
    let mut points = Vec::new();
    let mut labels = Vec::new();
    for (class, proto) in PROTOTYPES.iter().enumerate() {
        points.push(scale(scaler, proto));
        labels.push(class);
        for (j, jitter) in JITTER.iter().enumerate() {
            let raw: Vec<f64> = proto
                .iter()
                .enumerate()
                .map(|(c, v)| if (c + j) % 2 == 0 { v * (1.0 + jitter) } else { *v })
                .collect();
            points.push(scale(scaler, &raw));
            labels.push(class);
        }
    }

    ModelArtifact::Knn(KNearestNeighbors {
        classes: classes.to_vec(),
        points,
        labels,
        k: 5,
        weights: KnnWeights::Distance,
    })
}

/// Nearest-prototype network: `p·x - |p|²/2` per class, then a gain layer
fn ann(classes: &[usize], scaled: &[Vec<f64>]) -> ModelArtifact {
    let k = classes.len();
    let hidden = DenseLayer {
        weights: scaled.to_vec(),
        bias: scaled
            .iter()
            .map(|p| -0.5 * p.iter().map(|v| v * v).sum::<f64>())
            .collect(),
    };
    let output = DenseLayer {
        weights: (0..k)
            .map(|r| (0..k).map(|c| if r == c { 2.0 } else { 0.0 }).collect())
            .collect(),
        bias: vec![0.0; k],
    };

    ModelArtifact::Mlp(Mlp {
        classes: classes.to_vec(),
        layers: vec![hidden, output],
        activation: Activation::Identity,
    })
}

/// Multinomial logistic regression rewarding agreement across blocks
fn meta(classes: &[usize], base: &[(String, ModelArtifact)]) -> MetaArtifact {
    let k = classes.len();
    let layout = MetaLayout::new(
        base.iter()
            .map(|(name, _)| LayoutEntry::new(name.as_str(), k))
            .collect(),
    );
    let width = layout.total_width();

    let coef = (0..k)
        .map(|class| {
            (0..width)
                .map(|i| if i % k == class { 3.0 } else { 0.0 })
                .collect()
        })
        .collect();

    MetaArtifact {
        layout,
        model: ModelArtifact::LogisticRegression(LogisticRegression {
            classes: classes.to_vec(),
            coef,
            intercept: vec![0.0; k],
            multi_class: MultiClass::Multinomial,
        }),
    }
}
