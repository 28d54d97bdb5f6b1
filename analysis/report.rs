//! # Report Assembly
//!
//! Builds the single human-readable analysis report: dataset overview, the
//! four descriptive charts, the split summary, the model summary, and the
//! evaluation section with the confusion matrix and its derived statistics.
//! Everything is plain text on stdout; logging stays on stderr.

use crate::data::Dataset;
use crate::describe;
use crate::evaluate::Evaluation;
use crate::model::FittedModel;
use crate::split::Split;

/// Renders the complete analysis report.
pub fn render_report(
    dataset: &Dataset,
    split: &Split,
    model: &FittedModel,
    evaluation: &Evaluation,
) -> String {
    let mut out = String::new();
    out.push_str("==========================================\n");
    out.push_str("       Heart Disease Risk Analysis\n");
    out.push_str("==========================================\n\n");

    let (absent, present) = dataset.label_counts();
    out.push_str(&format!(
        "Records: {} ({} without disease, {} with disease)\n",
        dataset.n_records(),
        absent,
        present
    ));
    out.push_str("Missing values: none (complete-case input is enforced at load time)\n\n");

    out.push_str(&describe::outcome_distribution(dataset).render());
    out.push('\n');
    out.push_str(&describe::age_histogram(dataset).render());
    out.push('\n');
    out.push_str(&describe::chest_pain_distribution(dataset).render());
    out.push('\n');
    out.push_str(&describe::outcome_by_sex(dataset).render());
    out.push('\n');

    let (train_absent, train_present) = split.train.label_counts();
    let (test_absent, test_present) = split.test.label_counts();
    out.push_str("--- Train/test split ---\n");
    out.push_str(&format!(
        "train: {} records ({} without disease, {} with disease)\n",
        split.train.n_records(),
        train_absent,
        train_present
    ));
    out.push_str(&format!(
        "test:  {} records ({} without disease, {} with disease)\n\n",
        split.test.n_records(),
        test_absent,
        test_present
    ));

    out.push_str("--- Logistic regression fit ---\n");
    out.push_str(&model.summary());
    out.push('\n');

    out.push_str(&render_evaluation(evaluation));
    out
}

/// Renders the evaluation section on its own: the confusion matrix under the
/// documented positive-class convention, then the derived statistics.
pub fn render_evaluation(evaluation: &Evaluation) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "--- Evaluation (threshold {:.2}, positive class: 0 / no disease) ---\n",
        evaluation.predictions.threshold
    ));
    out.push_str(&format!("{}\n\n", evaluation.confusion));

    let m = &evaluation.confusion;
    out.push_str(&format!("Accuracy             : {}\n", format_rate(m.accuracy())));
    out.push_str(&format!("Kappa                : {}\n", format_rate(m.kappa())));
    out.push_str(&format!("Sensitivity          : {}\n", format_rate(m.sensitivity())));
    out.push_str(&format!("Specificity          : {}\n", format_rate(m.specificity())));
    out.push_str(&format!(
        "Pos Pred Value       : {}\n",
        format_rate(m.positive_predictive_value())
    ));
    out.push_str(&format!(
        "Neg Pred Value       : {}\n",
        format_rate(m.negative_predictive_value())
    ));
    out.push_str(&format!("Prevalence           : {}\n", format_rate(m.prevalence())));
    out.push_str(&format!(
        "Detection Rate       : {}\n",
        format_rate(m.detection_rate())
    ));
    out.push_str(&format!(
        "Detection Prevalence : {}\n",
        format_rate(m.detection_prevalence())
    ));
    out.push_str(&format!(
        "Balanced Accuracy    : {}\n",
        format_rate(m.balanced_accuracy())
    ));
    out
}

/// Rates with an empty denominator print as `NA`, the way the original
/// analysis displayed them.
fn format_rate(value: f64) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else {
        format!("{:.4}", value)
    }
}
