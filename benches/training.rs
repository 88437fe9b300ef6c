use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use scorecast::config::{ArtifactConfig, TrainerConfig};
use scorecast::logging::PipelineLogger;
use scorecast::training::{
    default_catalog, Algorithm, CandidateSpec, ModelTrainer, ParamSet, Regressor,
};

/// Matrix of `n_features` uniform columns with the target appended last
fn create_regression_matrix(n_rows: usize, n_features: usize) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut matrix = Array2::zeros((n_rows, n_features + 1));
    for mut row in matrix.rows_mut() {
        let mut target = 0.0;
        for j in 0..n_features {
            let value = rng.gen::<f64>() * 10.0;
            row[j] = value;
            target += value;
        }
        row[n_features] = target + rng.gen::<f64>() * 0.1;
    }
    matrix
}

fn split(matrix: &Array2<f64>) -> (Array2<f64>, Array1<f64>) {
    let k = matrix.ncols() - 1;
    (
        matrix.slice(ndarray::s![.., ..k]).to_owned(),
        matrix.column(k).to_owned(),
    )
}

fn bench_estimators(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimators");
    group.sample_size(10);

    let (x, y) = split(&create_regression_matrix(1000, 20));
    for spec in default_catalog() {
        group.bench_with_input(BenchmarkId::new("fit", &spec.name), &spec.algorithm, |b, algorithm| {
            b.iter(|| {
                let mut model = algorithm.build(&ParamSet::new(), 42).unwrap();
                model.fit(black_box(&x), black_box(&y)).unwrap();
                model
            })
        });
    }

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    let catalog = vec![
        CandidateSpec::new("Linear Regression", Algorithm::LinearRegression, Default::default()),
        CandidateSpec::new("Decision Tree", Algorithm::DecisionTree, Default::default()),
    ];

    for n_rows in [200, 1000, 5000].iter() {
        let train = create_regression_matrix(*n_rows, 20);
        let test = create_regression_matrix(*n_rows / 4, 20);
        let dir = tempfile::tempdir().unwrap();
        let trainer = ModelTrainer::new(
            ArtifactConfig::at(dir.path()),
            TrainerConfig::default(),
            PipelineLogger::disabled(),
        )
        .with_catalog(catalog.clone());

        group.bench_with_input(BenchmarkId::new("train", n_rows), &(train, test), |b, (train, test)| {
            b.iter(|| trainer.train(black_box(train), black_box(test)).unwrap())
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    let (x_train, y_train) = split(&create_regression_matrix(5000, 20));
    let mut model = Algorithm::RandomForest.build(&ParamSet::new(), 42).unwrap();
    model.fit(&x_train, &y_train).unwrap();

    for n_rows in [100, 1000, 10000].iter() {
        let (x, _) = split(&create_regression_matrix(*n_rows, 20));
        group.bench_with_input(BenchmarkId::new("predict", n_rows), &x, |b, x| {
            b.iter(|| model.predict(black_box(x)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_estimators, bench_training, bench_prediction);
criterion_main!(benches);
