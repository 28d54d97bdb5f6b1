use std::fs;
use std::process::Command;

use approx::assert_abs_diff_eq;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::tempdir;

use systole::data::{FEATURE_COLUMNS, load_dataset};
use systole::evaluate::evaluate_model;
use systole::fit::fit_logistic;
use systole::model::{Coefficient, FitConfig, FittedModel};
use systole::split::{SplitConfig, stratified_split};

/// Generates a heart-like CSV with a planted logistic signal: disease odds
/// rise with age, exercise-induced angina, and ST depression, and fall with
/// maximum heart rate. The remaining attributes are noise.
fn synthetic_heart_csv(n_records: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut csv = String::from(
        "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal,target\n",
    );
    for _ in 0..n_records {
        let age: i64 = rng.gen_range(29..=77);
        let sex = i64::from(rng.gen_bool(0.68));
        let cp: i64 = rng.gen_range(0..=3);
        let trestbps: i64 = rng.gen_range(94..=200);
        let chol: i64 = rng.gen_range(126..=420);
        let fbs = i64::from(rng.gen_bool(0.15));
        let restecg: i64 = rng.gen_range(0..=2);
        let thalach: i64 = rng.gen_range(88..=202);
        let exang = i64::from(rng.gen_bool(0.33));
        let tenths: i32 = rng.gen_range(0..=40);
        let oldpeak = f64::from(tenths) / 10.0;
        let slope: i64 = rng.gen_range(0..=2);
        let ca: i64 = rng.gen_range(0..=4);
        let thal: i64 = rng.gen_range(0..=3);

        let eta = 0.06 * (age as f64 - 54.0) + 0.9 * exang as f64
            - 0.04 * (thalach as f64 - 149.0)
            + 0.65 * (oldpeak - 2.0);
        let p = 1.0 / (1.0 + (-eta).exp());
        let target = i64::from(rng.gen_bool(p));

        csv.push_str(&format!(
            "{age},{sex},{cp},{trestbps},{chol},{fbs},{restecg},{thalach},{exang},{oldpeak:.1},{slope},{ca},{thal},{target}\n"
        ));
    }
    csv
}

fn coefficient<'a>(model: &'a FittedModel, term: &str) -> &'a Coefficient {
    model
        .coefficients
        .iter()
        .find(|c| c.term == term)
        .expect("term should be present in the fitted model")
}

#[test]
fn full_pipeline_learns_the_planted_signal() {
    let tmp = tempdir().expect("temporary directory");
    let csv_path = tmp.path().join("heart.csv");
    fs::write(&csv_path, synthetic_heart_csv(400, 7)).expect("write dataset");

    let dataset = load_dataset(csv_path.to_str().expect("path str")).expect("load dataset");
    assert_eq!(dataset.n_records(), 400);

    let split = stratified_split(&dataset, &SplitConfig::default()).expect("split dataset");
    assert_eq!(split.train.n_records() + split.test.n_records(), 400);

    let model = fit_logistic(
        split.train.features(),
        split.train.labels(),
        &FEATURE_COLUMNS,
        &FitConfig::default(),
    )
    .expect("fit model");

    assert!(model.diagnostics.residual_deviance < model.diagnostics.null_deviance);
    assert!(coefficient(&model, "age").estimate > 0.0);
    assert!(coefficient(&model, "exang").estimate > 0.0);
    assert!(coefficient(&model, "oldpeak").estimate > 0.0);
    assert!(coefficient(&model, "thalach").estimate < 0.0);
    assert!(coefficient(&model, "thalach").p_value < 0.01);
    assert!(coefficient(&model, "oldpeak").p_value < 0.05);

    let evaluation = evaluate_model(&model, &split.test, 0.5).expect("evaluate model");
    let matrix = &evaluation.confusion;
    assert_eq!(matrix.total(), split.test.n_records());
    assert!(
        matrix.accuracy() > 0.6,
        "held-out accuracy {} below floor",
        matrix.accuracy()
    );
    assert!(matrix.kappa() > 0.1, "kappa {} below floor", matrix.kappa());
}

#[test]
fn pipeline_is_deterministic_for_a_fixed_seed() {
    let tmp = tempdir().expect("temporary directory");
    let csv_path = tmp.path().join("heart.csv");
    fs::write(&csv_path, synthetic_heart_csv(240, 11)).expect("write dataset");
    let dataset = load_dataset(csv_path.to_str().expect("path str")).expect("load dataset");

    let config = SplitConfig {
        train_fraction: 0.7,
        seed: 99,
    };
    let split_a = stratified_split(&dataset, &config).expect("first split");
    let split_b = stratified_split(&dataset, &config).expect("second split");
    assert_eq!(split_a.train_indices, split_b.train_indices);
    assert_eq!(split_a.test_indices, split_b.test_indices);

    let fit = |split: &systole::split::Split| {
        fit_logistic(
            split.train.features(),
            split.train.labels(),
            &FEATURE_COLUMNS,
            &FitConfig::default(),
        )
        .expect("fit model")
    };
    let model_a = fit(&split_a);
    let model_b = fit(&split_b);
    for (a, b) in model_a.coefficients.iter().zip(model_b.coefficients.iter()) {
        assert_eq!(a.term, b.term);
        assert_abs_diff_eq!(a.estimate, b.estimate, epsilon = 1e-12);
        assert_abs_diff_eq!(a.std_error, b.std_error, epsilon = 1e-12);
    }
}

#[test]
fn model_artifact_round_trips_through_disk() {
    let tmp = tempdir().expect("temporary directory");
    let csv_path = tmp.path().join("heart.csv");
    fs::write(&csv_path, synthetic_heart_csv(240, 13)).expect("write dataset");
    let dataset = load_dataset(csv_path.to_str().expect("path str")).expect("load dataset");
    let split = stratified_split(&dataset, &SplitConfig::default()).expect("split dataset");

    let model = fit_logistic(
        split.train.features(),
        split.train.labels(),
        &FEATURE_COLUMNS,
        &FitConfig::default(),
    )
    .expect("fit model");

    let model_path = tmp.path().join("model.toml");
    model
        .save(model_path.to_str().expect("path str"))
        .expect("save model");
    let restored = FittedModel::load(model_path.to_str().expect("path str")).expect("load model");

    assert_eq!(restored.coefficients.len(), model.coefficients.len());
    let original = model.predict(split.test.features()).expect("predict");
    let reloaded = restored.predict(split.test.features()).expect("predict");
    for (&a, &b) in original.iter().zip(reloaded.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
}

#[test]
fn cli_analyze_prints_the_report() {
    let tmp = tempdir().expect("temporary directory");
    let csv_path = tmp.path().join("heart.csv");
    fs::write(&csv_path, synthetic_heart_csv(240, 3)).expect("write dataset");

    let exe = env!("CARGO_BIN_EXE_systole");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args(["analyze", csv_path.to_str().expect("path str")])
        .output()
        .expect("run systole cli");

    assert!(
        output.status.success(),
        "CLI exited with status {:?}",
        output.status
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Heart Disease Risk Analysis"));
    assert!(stdout.contains("--- Outcome distribution ---"));
    assert!(stdout.contains("Coefficients:"));
    assert!(stdout.contains("Balanced Accuracy"));
}

#[test]
fn cli_train_then_evaluate_writes_artifacts() {
    let tmp = tempdir().expect("temporary directory");
    let csv_path = tmp.path().join("heart.csv");
    fs::write(&csv_path, synthetic_heart_csv(240, 5)).expect("write dataset");
    let csv_arg = csv_path.to_str().expect("path str");

    let exe = env!("CARGO_BIN_EXE_systole");
    let status = Command::new(exe)
        .current_dir(tmp.path())
        .args(["train", csv_arg])
        .status()
        .expect("run systole cli");
    assert!(status.success(), "CLI exited with status {status:?}");
    assert!(tmp.path().join("model.toml").exists(), "model.toml missing");

    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args(["evaluate", csv_arg, "--model", "model.toml"])
        .output()
        .expect("run systole cli");
    assert!(
        output.status.success(),
        "CLI exited with status {:?}",
        output.status
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--- Evaluation"));

    let predictions_path = tmp.path().join("predictions.tsv");
    assert!(predictions_path.exists(), "predictions.tsv missing");
    let predictions = fs::read_to_string(predictions_path).expect("read predictions");
    assert!(predictions.starts_with("record\tprobability\tpredicted\tobserved"));
    assert_eq!(predictions.lines().count(), 241);
}

#[test]
fn cli_rejects_an_out_of_range_threshold_before_reading_data() {
    let tmp = tempdir().expect("temporary directory");

    // The data file deliberately does not exist: the threshold check must
    // fire before any loading is attempted.
    let exe = env!("CARGO_BIN_EXE_systole");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args(["analyze", "absent.csv", "--threshold", "1.5"])
        .output()
        .expect("run systole cli");

    assert!(!output.status.success(), "CLI should reject the threshold");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("--threshold must lie strictly between 0 and 1"),
        "stderr was: {stderr}"
    );
}

#[test]
fn cli_analyze_writes_the_report_to_a_file() {
    let tmp = tempdir().expect("temporary directory");
    let csv_path = tmp.path().join("heart.csv");
    fs::write(&csv_path, synthetic_heart_csv(240, 17)).expect("write dataset");

    let exe = env!("CARGO_BIN_EXE_systole");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "analyze",
            csv_path.to_str().expect("path str"),
            "--output",
            "report.txt",
        ])
        .output()
        .expect("run systole cli");

    assert!(
        output.status.success(),
        "CLI exited with status {:?}",
        output.status
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Report written to: report.txt"));
    assert!(!stdout.contains("Heart Disease Risk Analysis"));

    let report = fs::read_to_string(tmp.path().join("report.txt")).expect("read report");
    assert!(report.contains("Heart Disease Risk Analysis"));
    assert!(report.contains("Balanced Accuracy"));
}

#[test]
fn cli_rejects_a_file_without_the_outcome_column() {
    let tmp = tempdir().expect("temporary directory");
    let csv_path = tmp.path().join("broken.csv");
    fs::write(
        &csv_path,
        "age,sex,cp,trestbps,chol,fbs,restecg,thalach,exang,oldpeak,slope,ca,thal\n\
         63,1,3,145,233,1,0,150,0,2.3,0,0,1\n\
         37,1,2,130,250,0,1,187,0,3.5,0,0,2\n",
    )
    .expect("write dataset");

    let exe = env!("CARGO_BIN_EXE_systole");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args(["analyze", csv_path.to_str().expect("path str")])
        .output()
        .expect("run systole cli");

    assert!(!output.status.success(), "CLI should fail on a bad schema");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("target"), "stderr was: {stderr}");
}
