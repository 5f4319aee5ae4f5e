use log::{debug, warn};

use crate::model::{Measure, PollEntry};

/// Critical value for a 95% confidence level.
pub const Z_95: f64 = 1.96;

/// The margin of error of a vote intention, in percentage points, rounded to
/// two decimals.
///
/// Arguments:
/// * `intentions` the vote intention, in percent
/// * `sample` the number of respondents
/// * `z` the critical value of the confidence level
pub fn margin_of_error(intentions: f64, sample: f64, z: f64) -> Option<f64> {
    if !(0.0..=100.0).contains(&intentions) || !sample.is_finite() || sample <= 0.0 {
        return None;
    }
    let p = intentions / 100.0;
    let se = (p * (1.0 - p) / sample).sqrt();
    Some(round2(z * se * 100.0))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Fills the margins of the result rows that have none.
///
/// The sample size is the one of the most specific sub-sample, falling back
/// on the full sample. The lower margin is a magnitude, capped so that the
/// interval does not go below zero.
///
/// Returns the number of rows that were updated.
pub fn fill_margins(entry: &mut PollEntry) -> usize {
    let m = &entry.metadata;
    let raw_sample = m.most_specific_sub_sample().unwrap_or(&m.echantillon);
    let sample = match raw_sample.trim().parse::<f64>() {
        Ok(x) => x,
        Err(_) => {
            warn!(
                "fill_margins: {}: cannot read the sample size {:?}",
                m.poll_id, raw_sample
            );
            return 0;
        }
    };

    let mut updated = 0;
    for r in entry.results.iter_mut() {
        if !r.erreur_sup.is_blank() || !r.erreur_inf.is_blank() {
            continue;
        }
        let intentions = match r.intentions.value {
            Some(x) => x,
            None => continue,
        };
        if let Some(moe) = margin_of_error(intentions, sample, Z_95) {
            r.erreur_sup = Measure::from_value(moe);
            r.erreur_inf = Measure::from_value(round2(moe.min(intentions)));
            updated += 1;
        }
    }
    debug!(
        "fill_margins: {}: sample {}, {} rows updated",
        entry.metadata.poll_id, sample, updated
    );
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubSample;
    use crate::testing::*;

    #[test]
    fn known_values() {
        assert_eq!(margin_of_error(36.0, 1200.0, Z_95), Some(2.72));
        assert_eq!(margin_of_error(50.0, 1000.0, Z_95), Some(3.1));
        assert_eq!(margin_of_error(0.0, 1000.0, Z_95), Some(0.0));
        assert_eq!(margin_of_error(36.0, 0.0, Z_95), None);
        assert_eq!(margin_of_error(136.0, 1000.0, Z_95), None);
    }

    #[test]
    fn fills_blank_rows_only() {
        let mut ds = sample_dataset();
        let entry = &mut ds.polls[0];
        entry.results[1] = result_row("Jean-Luc Mélenchon", "12", "1.5", "1.5", 3);
        assert_eq!(fill_margins(entry), 1);
        assert_eq!(entry.results[0].erreur_sup.raw, "2.72");
        assert_eq!(entry.results[0].erreur_inf.raw, "2.72");
        assert_eq!(entry.results[1].erreur_sup.raw, "1.5");
    }

    #[test]
    fn uses_the_most_specific_sub_sample() {
        let mut ds = sample_dataset();
        let entry = &mut ds.polls[0];
        entry.metadata.sub_samples = vec![
            SubSample {
                suffix: 1,
                sample: Some("1000".to_string()),
                population: Some("Certains d'aller voter".to_string()),
            },
            SubSample {
                suffix: 2,
                sample: Some("".to_string()),
                population: None,
            },
        ];
        fill_margins(entry);
        assert_eq!(entry.results[0].erreur_sup.value, margin_of_error(36.0, 1000.0, Z_95));
    }

    #[test]
    fn lower_margin_is_capped() {
        let mut ds = sample_dataset();
        let entry = &mut ds.polls[0];
        entry.metadata.echantillon = "30".to_string();
        entry.results[0] = result_row("Marine Le Pen", "1", "", "", 2);
        fill_margins(entry);
        assert_eq!(entry.results[0].erreur_sup.value, Some(3.56));
        assert_eq!(entry.results[0].erreur_inf.value, Some(1.0));
    }
}
