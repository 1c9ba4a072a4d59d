//! Property-based tests for datasets, splits and history using proptest.

use proptest::prelude::*;

use trialcut_train::{Dataset, History, ValidSplit};

fn labelled(n_classes: usize) -> impl Strategy<Value = Dataset> {
    prop::collection::vec(0..n_classes, 1..60).prop_map(|labels| {
        let features = labels.iter().map(|&l| vec![l as f64, 1.0]).collect();
        Dataset::new(features, labels).unwrap()
    })
}

// --- ValidSplit ---

proptest! {
    #[test]
    fn split_partitions_every_sample(data in labelled(3), cv in 2usize..6) {
        if let Ok((train, valid)) = ValidSplit::new(cv).unwrap().split(&data) {
            prop_assert_eq!(train.len() + valid.len(), data.len());
            for class in 0..3 {
                let count = |d: &Dataset| d.labels().iter().filter(|&&l| l == class).count();
                prop_assert_eq!(count(&valid), count(&data) / cv);
            }
        }
    }

    #[test]
    fn split_is_deterministic(data in labelled(2), cv in 2usize..6) {
        let split = ValidSplit::new(cv).unwrap();
        let a = split.split(&data).ok();
        let b = split.split(&data).ok();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn small_cv_is_rejected(cv in 0usize..2) {
        prop_assert!(ValidSplit::new(cv).is_err());
    }
}

// --- History ---

proptest! {
    #[test]
    fn history_values_follow_pushes(values in prop::collection::vec(-1e6f64..1e6, 0..20)) {
        let mut history = History::new();
        for v in &values {
            history.push([("valid_acc".to_string(), *v)].into_iter().collect());
        }
        prop_assert_eq!(history.len(), values.len());
        prop_assert_eq!(history.values("valid_acc"), values.clone());
        prop_assert_eq!(history.last_value("valid_acc"), values.last().copied());
        prop_assert_eq!(history.last_value("valid_loss"), None);
    }
}
