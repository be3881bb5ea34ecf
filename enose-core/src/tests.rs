//! Pipeline tests over in-memory models

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::model::{LinearSvc, ProbabilisticClassifier};

// ═══════════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════════

/// Returns a fixed vector, counting calls and recording the last input
#[derive(Debug)]
struct Fixed {
    classes: Vec<usize>,
    n_features: usize,
    out: Result<Vec<f64>, ScoreError>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<f64>>>,
}

impl Fixed {
    fn new(n_features: usize, out: Vec<f64>) -> Self {
        Self {
            classes: (0..out.len()).collect(),
            n_features,
            out: Ok(out),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing(n_features: usize, classes: usize) -> Self {
        Self {
            out: Err(ScoreError::Corrupt("weights truncated".into())),
            ..Self::new(n_features, vec![0.0; classes])
        }
    }
}

impl ProbabilisticClassifier for Fixed {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock().unwrap() = x.to_vec();
        self.out.clone()
    }
}

fn channels() -> Vec<SensorChannel> {
    vec![
        SensorChannel::Mq136,
        SensorChannel::Mq137,
        SensorChannel::Temp,
        SensorChannel::Humi,
    ]
}

fn codec(k: usize) -> LabelCodec {
    LabelCodec::new((0..k).map(|i| format!("grade_{}", i + 1)).collect()).unwrap()
}

fn layout(names: &[&str], width: usize) -> MetaLayout {
    MetaLayout::new(names.iter().map(|n| LayoutEntry::new(*n, width)).collect())
}

fn parts(
    base: Vec<(&str, ClassifierHandle)>,
    recorded: &[&str],
    meta: ClassifierHandle,
    labels: usize,
) -> PipelineParts {
    let width = base[0].1.width();
    PipelineParts {
        channels: channels(),
        scaler: FeatureScaler::identity(4),
        pool: BaseModelPool::new(base.into_iter().map(|(n, h)| (n.to_string(), h)).collect())
            .unwrap(),
        assembler: MetaFeatureAssembler::new(layout(recorded, width), "meta"),
        meta: MetaClassifier::new(meta).unwrap(),
        codec: codec(labels),
        masker: IdentityMasker::default(),
    }
}

fn reading() -> SensorReading {
    SensorReading::new(vec![0.4, 1.2, 29.0, 61.0])
}

// ═══════════════════════════════════════════════════════════════════════════════
// END-TO-END
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_run_reports_every_model_with_meta_last() {
    let orch = PredictionOrchestrator::new(parts(
        vec![
            ("random_forest", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.1, 0.7, 0.2]))),
            ("xgboost", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.6, 0.3, 0.1]))),
            ("knn", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.2, 0.2, 0.6]))),
        ],
        &["random_forest", "xgboost", "knn"],
        ClassifierHandle::probabilistic(Fixed::new(9, vec![0.123456, 0.8, 0.076544])),
        3,
    ))
    .unwrap();

    let result = orch.run(&reading()).unwrap();
    let names: Vec<_> = result.predictions().iter().map(|p| p.model.as_str()).collect();
    assert_eq!(names, vec!["base_2", "base_3", "base_4", "meta"]);

    assert_eq!(result.base()[0].class_label, "grade_2");
    assert_eq!(result.base()[1].class_label, "grade_1");
    assert_eq!(result.base()[2].class_label, "grade_3");
    assert_eq!(result.base()[0].probability, Some(0.7));

    let meta = result.meta().unwrap();
    assert_eq!(meta.class_label, "grade_2");
    assert_eq!(meta.probability, Some(0.8));
    assert_eq!(result.input_data(), reading().values());
}

#[test]
fn test_meta_features_follow_registration_order() {
    let meta = Fixed::new(6, vec![0.5, 0.5]);
    let seen = meta.seen.clone();

    let orch = PredictionOrchestrator::new(parts(
        vec![
            ("knn", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.9, 0.1]))),
            ("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.3, 0.7]))),
            ("xgboost", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.25, 0.75]))),
        ],
        &["knn", "ann", "xgboost"],
        ClassifierHandle::probabilistic(meta),
        2,
    ))
    .unwrap();

    orch.run(&reading()).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0.9, 0.1, 0.3, 0.7, 0.25, 0.75]);
}

#[test]
fn test_scoring_model_reports_no_probability() {
    let svc = LinearSvc {
        classes: vec![0, 1],
        coef: vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]],
        intercept: vec![0.0, 0.0],
    };
    let orch = PredictionOrchestrator::new(parts(
        vec![
            ("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.4, 0.6]))),
            ("svm", ClassifierHandle::scoring(svc)),
        ],
        &["ann", "svm"],
        ClassifierHandle::probabilistic(Fixed::new(4, vec![0.3, 0.7])),
        2,
    ))
    .unwrap();

    let result = orch.run(&reading()).unwrap();
    let svm = result.get("svm").unwrap();
    assert_eq!(svm.class_label, "grade_2");
    assert_eq!(svm.probability, None);

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains(r#""svm":{"class_label":"grade_2"}"#));
    assert!(json.contains(r#""base_1":{"class_label":"grade_2","probability":0.6}"#));
    assert!(json.find("base_1").unwrap() < json.find("svm").unwrap());
    assert!(json.find("svm").unwrap() < json.find("\"meta\"").unwrap());
}

// ═══════════════════════════════════════════════════════════════════════════════
// FAILURES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_short_reading_invokes_no_model() {
    let base = Fixed::new(4, vec![0.5, 0.5]);
    let calls = base.calls.clone();
    let orch = PredictionOrchestrator::new(parts(
        vec![("ann", ClassifierHandle::probabilistic(base))],
        &["ann"],
        ClassifierHandle::probabilistic(Fixed::new(2, vec![0.5, 0.5])),
        2,
    ))
    .unwrap();

    let err = orch
        .run(&SensorReading::new(vec![1.0, 2.0, 3.0]))
        .unwrap_err();
    assert!(matches!(
        err,
        EnoseError::Validation {
            expected: 4,
            received: 3
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_non_finite_reading_rejected() {
    let orch = PredictionOrchestrator::new(parts(
        vec![("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5])))],
        &["ann"],
        ClassifierHandle::probabilistic(Fixed::new(2, vec![0.5, 0.5])),
        2,
    ))
    .unwrap();

    let err = orch
        .run(&SensorReading::new(vec![1.0, f64::NAN, 3.0, 4.0]))
        .unwrap_err();
    assert!(matches!(err, EnoseError::NonFiniteInput { position: 1 }));
}

#[test]
fn test_base_failure_names_model_and_skips_meta() {
    let meta = Fixed::new(6, vec![0.5, 0.5]);
    let meta_calls = meta.calls.clone();
    let later = Fixed::new(4, vec![0.5, 0.5]);
    let later_calls = later.calls.clone();
    let orch = PredictionOrchestrator::new(parts(
        vec![
            ("random_forest", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5]))),
            ("knn", ClassifierHandle::probabilistic(Fixed::failing(4, 2))),
            ("ann", ClassifierHandle::probabilistic(later)),
        ],
        &["random_forest", "knn", "ann"],
        ClassifierHandle::probabilistic(meta),
        2,
    ))
    .unwrap();

    let err = orch.run(&reading()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Inference);
    assert_eq!(err.model(), Some("knn"));
    assert_eq!(later_calls.load(Ordering::SeqCst), 0, "models after the failure must not run");
    assert_eq!(meta_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_index_outside_label_set() {
    let orch = PredictionOrchestrator::new(parts(
        vec![("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.1, 0.1, 0.8])))],
        &["ann"],
        ClassifierHandle::probabilistic(Fixed::new(3, vec![0.1, 0.1, 0.8])),
        2,
    ))
    .unwrap();
    assert_eq!(orch.uncovered_classes(), vec![2]);

    let err = orch.run(&reading()).unwrap_err();
    assert!(matches!(err, EnoseError::UnknownLabel { index: 2, classes: 2 }));
    assert_eq!(err.kind().code(), "UNKNOWN_LABEL");
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSISTENCY CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_reordered_pool_rejected() {
    let result = PredictionOrchestrator::new(parts(
        vec![
            ("xgboost", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5]))),
            ("random_forest", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5]))),
        ],
        &["random_forest", "xgboost"],
        ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5])),
        2,
    ));
    assert!(matches!(result, Err(EnoseError::Inconsistent(_))));
}

#[test]
fn test_class_space_disagreement_rejected() {
    let mut odd = Fixed::new(4, vec![0.5, 0.5]);
    odd.classes = vec![1, 0];
    let result = PredictionOrchestrator::new(parts(
        vec![
            ("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5]))),
            ("knn", ClassifierHandle::probabilistic(odd)),
        ],
        &["ann", "knn"],
        ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5])),
        2,
    ));
    assert!(matches!(result, Err(EnoseError::Inconsistent(_))));
}

#[test]
fn test_feature_count_mismatch_rejected() {
    let result = PredictionOrchestrator::new(parts(
        vec![("ann", ClassifierHandle::probabilistic(Fixed::new(5, vec![0.5, 0.5])))],
        &["ann"],
        ClassifierHandle::probabilistic(Fixed::new(2, vec![0.5, 0.5])),
        2,
    ));
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArtifactLoad);
}

#[test]
fn test_meta_width_mismatch_rejected() {
    let result = PredictionOrchestrator::new(parts(
        vec![("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5])))],
        &["ann"],
        ClassifierHandle::probabilistic(Fixed::new(3, vec![0.5, 0.5])),
        2,
    ));
    assert!(result.is_err());
}

#[test]
fn test_masked_name_collision_rejected() {
    // an unknown model literally called base_1 would shadow the ann alias
    let result = PredictionOrchestrator::new(parts(
        vec![
            ("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5]))),
            ("base_1", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5]))),
        ],
        &["ann", "base_1"],
        ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5])),
        2,
    ));
    assert!(matches!(result, Err(EnoseError::Inconsistent(_))));
}

#[test]
fn test_masked_channel_collision_rejected() {
    // an unknown channel literally called sensor_1 would shadow the MQ136 alias
    let mut pipeline = parts(
        vec![("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5])))],
        &["ann"],
        ClassifierHandle::probabilistic(Fixed::new(2, vec![0.5, 0.5])),
        2,
    );
    pipeline.channels = vec![
        SensorChannel::Mq136,
        SensorChannel::Other("sensor_1".into()),
        SensorChannel::Temp,
        SensorChannel::Humi,
    ];

    let err = PredictionOrchestrator::new(pipeline).unwrap_err();
    assert!(matches!(err, EnoseError::Inconsistent(_)));
    assert!(err.to_string().contains("sensor_1"));
}

#[test]
fn test_unknown_channel_with_free_name_accepted() {
    let mut pipeline = parts(
        vec![("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5])))],
        &["ann"],
        ClassifierHandle::probabilistic(Fixed::new(2, vec![0.5, 0.5])),
        2,
    );
    pipeline.channels[1] = SensorChannel::Other("BME680".into());

    let orch = PredictionOrchestrator::new(pipeline).unwrap();
    assert_eq!(
        orch.masked_channels(),
        vec!["sensor_1", "BME680", "sensor_3", "sensor_4"]
    );
}

#[test]
fn test_models_listing_is_masked() {
    let orch = PredictionOrchestrator::new(parts(
        vec![
            ("random_forest", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5]))),
            ("ann", ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5]))),
        ],
        &["random_forest", "ann"],
        ClassifierHandle::probabilistic(Fixed::new(4, vec![0.5, 0.5])),
        2,
    ))
    .unwrap();

    let names: Vec<_> = orch.models().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["base_2", "base_1", "meta"]);
    assert_eq!(
        orch.masked_channels(),
        vec!["sensor_1", "sensor_2", "sensor_3", "sensor_4"]
    );
}
