//! Cycle segmentation and peak evaluation.
//!
//! A measurement file is a noisy per-port depth trace: the reading drops
//! towards zero each time the rig releases the plug, then climbs to the
//! plug-in depth of the next cycle. Readings strictly below the cycle
//! boundary mark the start of a new cycle; only each cycle's peak survives
//! into the result table.

use super::model::{
    CycleRow, EvalError, FileEvaluation, FileLimits, MeasurementTable, OverFilteredKind,
    Thresholds,
};

/// Rows discarded from the head of every channel before segmentation
/// (instrument warm-up/settling artifact).
const WARMUP_ROWS: usize = 20;

/// Kept-cycle count above which a handover warning is emitted.
const HANDOVER_LIMIT: usize = 15;

/// Evaluate one parsed measurement table against the thresholds.
///
/// `file` is only used to label results and errors.
pub fn evaluate(
    file: &str,
    table: &MeasurementTable,
    thresholds: &Thresholds,
) -> Result<FileEvaluation, EvalError> {
    // Limits come from the un-trimmed table, rows 0 and 1 specifically.
    let limits = capture_limits(table);

    let infusion = trim_channel(&table.infusion);
    let injection = table.injection.as_deref().map(trim_channel);

    let starts = cycle_starts(&infusion, injection.as_deref(), thresholds.cycle_boundary);
    if starts.is_empty() || starts.len() == infusion.len() {
        return Err(EvalError::OverFiltered {
            file: file.to_string(),
            kind: OverFilteredKind::Cycles,
        });
    }

    let infusion_cycles = split_cycles(&infusion, &starts);
    let injection_cycles = injection.as_deref().map(|ch| split_cycles(ch, &starts));

    let mut rows = Vec::new();
    for (i, infusion_cycle) in infusion_cycles.iter().enumerate() {
        let infusion_peak = peak(infusion_cycle);
        let infusion_passes = infusion_peak.is_some_and(|p| p >= thresholds.infusion_min);

        let (injection_peak, injection_passes) = match &injection_cycles {
            Some(cycles) => {
                let p = peak(&cycles[i]);
                (p, p.is_some_and(|v| v >= thresholds.injection_min))
            }
            None => (None, false),
        };

        if infusion_passes || injection_passes {
            rows.push(CycleRow {
                infusion_peak: infusion_peak.unwrap_or(0.0),
                injection_peak: injection_peak.unwrap_or(0.0),
                infusion_below: !infusion_passes,
                injection_below: !injection_passes,
            });
        }
    }

    if rows.is_empty() {
        let all_infusion_failed = infusion_cycles
            .iter()
            .all(|c| !peak(c).is_some_and(|p| p >= thresholds.infusion_min));
        let kind = if all_infusion_failed {
            OverFilteredKind::Infusion
        } else {
            OverFilteredKind::Injection
        };
        return Err(EvalError::OverFiltered {
            file: file.to_string(),
            kind,
        });
    }

    let mut one_port = table.is_one_port();
    let mut notes = Vec::new();

    // A two-port file whose injection channel never passed is treated as
    // one-port from here on; the injection columns carry no information.
    if !one_port && rows.iter().all(|r| r.injection_below) {
        notes.push(format!(
            "Warning: no injection measurements found. One port file ({file}) detected."
        ));
        one_port = true;
    }

    if rows.len() > HANDOVER_LIMIT {
        notes.push(format!(
            "Warning: more than {HANDOVER_LIMIT} measurements found in \"{file}\". \
             The handover from 3T to 2F may have triggered an extra cycle; \
             adjust the filters to remove unwanted measurements."
        ));
    }

    Ok(FileEvaluation {
        file_name: file.to_string(),
        rows,
        limits,
        one_port,
        notes,
    })
}

// ---------------------------------------------------------------------------
// Segmentation helpers
// ---------------------------------------------------------------------------

/// Drop the warm-up rows and any missing values; the result is reindexed
/// contiguously from 0.
fn trim_channel(raw: &[Option<f64>]) -> Vec<f64> {
    raw.iter().skip(WARMUP_ROWS).filter_map(|v| *v).collect()
}

/// Indices whose value lies strictly below the cycle boundary.
fn candidate_starts(channel: &[f64], boundary: f64) -> Vec<usize> {
    channel
        .iter()
        .enumerate()
        .filter(|(_, &v)| v < boundary)
        .map(|(i, _)| i)
        .collect()
}

/// Authoritative cycle-start list. Two channels may disagree on the number
/// of detected cycles; the shorter candidate list wins, ties going to the
/// injection list (explicit tie-break policy, inherited behavior).
fn cycle_starts(infusion: &[f64], injection: Option<&[f64]>, boundary: f64) -> Vec<usize> {
    let infusion_starts = candidate_starts(infusion, boundary);
    match injection {
        None => infusion_starts,
        Some(ch) => {
            let injection_starts = candidate_starts(ch, boundary);
            if infusion_starts.len() < injection_starts.len() {
                infusion_starts
            } else {
                injection_starts
            }
        }
    }
}

/// Partition a channel into cycles: cycle *i* spans start[i]..start[i+1],
/// the last cycle runs to the end of the sequence. The start list may come
/// from the other channel, so ranges are clamped to this channel's length.
fn split_cycles<'a>(channel: &'a [f64], starts: &[usize]) -> Vec<&'a [f64]> {
    let len = channel.len();
    (0..starts.len())
        .map(|i| {
            let begin = starts[i].min(len);
            let end = match starts.get(i + 1) {
                Some(&next) => next.min(len).max(begin),
                None => len,
            };
            &channel[begin..end]
        })
        .collect()
}

/// Largest reading of a cycle; an empty clamped cycle has none.
fn peak(cycle: &[f64]) -> Option<f64> {
    cycle.iter().copied().reduce(f64::max)
}

/// First two raw readings of each channel, before trimming. Blank leading
/// cells surface as NaN in the report annotation.
fn capture_limits(table: &MeasurementTable) -> FileLimits {
    FileLimits {
        infusion: (raw_at(&table.infusion, 0), raw_at(&table.infusion, 1)),
        injection: match &table.injection {
            Some(ch) => (raw_at(ch, 0), raw_at(ch, 1)),
            None => (0.0, 0.0),
        },
    }
}

fn raw_at(raw: &[Option<f64>], idx: usize) -> f64 {
    raw.get(idx).copied().flatten().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20 warm-up readings followed by the given tail, as a raw channel.
    fn with_warmup(tail: &[f64]) -> Vec<Option<f64>> {
        let mut raw = vec![Some(0.0); WARMUP_ROWS];
        raw.extend(tail.iter().map(|&v| Some(v)));
        raw
    }

    fn two_port(infusion: &[f64], injection: &[f64]) -> MeasurementTable {
        MeasurementTable {
            infusion: with_warmup(infusion),
            injection: Some(with_warmup(injection)),
        }
    }

    fn one_port(infusion: &[f64]) -> MeasurementTable {
        MeasurementTable {
            infusion: with_warmup(infusion),
            injection: None,
        }
    }

    fn thresholds(boundary: f64, infusion_min: f64, injection_min: f64) -> Thresholds {
        Thresholds {
            cycle_boundary: boundary,
            infusion_min,
            injection_min,
        }
    }

    #[test]
    fn two_cycles_with_expected_peaks() {
        // The reference trace: two dips below the boundary, peaks 0.9 / 0.3.
        let table = one_port(&[0.005, 0.9, 0.005, 0.3]);
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();

        assert_eq!(eval.rows.len(), 2);
        assert_eq!(eval.rows[0].infusion_peak, 0.9);
        assert_eq!(eval.rows[1].infusion_peak, 0.3);
        assert!(eval.rows.iter().all(|r| !r.infusion_below));
        assert!(eval.one_port);
    }

    #[test]
    fn single_leading_crossing_yields_one_cycle_spanning_the_trace() {
        // No further value below the boundary after the initial release:
        // one cycle covering the whole trimmed trace.
        let table = one_port(&[0.005, 0.5, 0.6, 0.7]);
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();

        assert_eq!(eval.rows.len(), 1);
        assert_eq!(eval.rows[0].infusion_peak, 0.7);
    }

    #[test]
    fn warmup_rows_are_discarded() {
        // Dips inside the warm-up window must not create cycles.
        let mut raw = vec![Some(0.001); WARMUP_ROWS];
        raw.extend([Some(0.005), Some(0.9)].iter().copied());
        let table = MeasurementTable {
            infusion: raw,
            injection: None,
        };
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();
        assert_eq!(eval.rows.len(), 1);
        assert_eq!(eval.rows[0].infusion_peak, 0.9);
    }

    #[test]
    fn missing_values_are_dropped_before_segmentation() {
        let mut raw = vec![Some(0.0); WARMUP_ROWS];
        raw.extend([Some(0.005), None, Some(0.9), None, Some(0.005), Some(0.3)]);
        let table = MeasurementTable {
            infusion: raw,
            injection: None,
        };
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();
        assert_eq!(eval.rows.len(), 2);
        assert_eq!(eval.rows[0].infusion_peak, 0.9);
        assert_eq!(eval.rows[1].infusion_peak, 0.3);
    }

    #[test]
    fn raising_the_boundary_never_loses_candidates() {
        let channel = [0.005, 0.9, 0.02, 0.3, 0.001, 0.5];
        let low = candidate_starts(&channel, 0.01);
        let high = candidate_starts(&channel, 0.05);
        assert!(high.len() >= low.len());
        assert!(low.iter().all(|i| high.contains(i)));
    }

    #[test]
    fn shorter_candidate_list_wins() {
        // Infusion dips twice, injection once: injection's list is shorter
        // and authoritative, so there is a single cycle.
        let table = two_port(&[0.005, 0.9, 0.005, 0.8], &[0.005, 0.4, 0.2, 0.4]);
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();

        assert_eq!(eval.rows.len(), 1);
        assert_eq!(eval.rows[0].infusion_peak, 0.9);
        assert_eq!(eval.rows[0].injection_peak, 0.4);
    }

    #[test]
    fn equal_length_lists_use_the_injection_list() {
        // Same count, different positions: the injection list is taken, so
        // the second cycle starts at injection's second dip (index 3).
        let table = two_port(&[0.005, 0.9, 0.005, 0.8, 0.7], &[0.005, 0.4, 0.3, 0.005, 0.4]);
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();

        assert_eq!(eval.rows.len(), 2);
        assert_eq!(eval.rows[0].infusion_peak, 0.9);
        assert_eq!(eval.rows[1].infusion_peak, 0.8);
        assert_eq!(eval.rows[1].injection_peak, 0.4);
    }

    #[test]
    fn every_row_a_boundary_is_over_filtered() {
        let table = one_port(&[0.001, 0.002, 0.003]);
        match evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)) {
            Err(EvalError::OverFiltered { kind, .. }) => {
                assert_eq!(kind, OverFilteredKind::Cycles);
            }
            other => panic!("expected OverFiltered(Cycles), got {other:?}"),
        }
    }

    #[test]
    fn no_boundary_at_all_is_over_filtered() {
        let table = one_port(&[0.5, 0.6, 0.7]);
        match evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)) {
            Err(EvalError::OverFiltered { kind, .. }) => {
                assert_eq!(kind, OverFilteredKind::Cycles);
            }
            other => panic!("expected OverFiltered(Cycles), got {other:?}"),
        }
    }

    #[test]
    fn all_peaks_below_minimum_is_over_filtered_infusion() {
        let table = one_port(&[0.005, 0.1, 0.005, 0.15]);
        match evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)) {
            Err(EvalError::OverFiltered { kind, .. }) => {
                assert_eq!(kind, OverFilteredKind::Infusion);
            }
            other => panic!("expected OverFiltered(Infusion), got {other:?}"),
        }
    }

    #[test]
    fn row_kept_iff_either_channel_passes() {
        // Cycle 1: both pass. Cycle 2: only infusion. Cycle 3: only
        // injection. Cycle 4: neither (dropped).
        let table = two_port(
            &[0.005, 0.9, 0.005, 0.8, 0.005, 0.05, 0.005, 0.01],
            &[0.005, 0.4, 0.005, 0.05, 0.005, 0.4, 0.005, 0.01],
        );
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();

        assert_eq!(eval.rows.len(), 3);

        // Both pass: both flags false.
        assert!(!eval.rows[0].infusion_below);
        assert!(!eval.rows[0].injection_below);

        // Infusion only: injection flagged.
        assert!(!eval.rows[1].infusion_below);
        assert!(eval.rows[1].injection_below);

        // Injection only: infusion flagged.
        assert!(eval.rows[2].infusion_below);
        assert!(!eval.rows[2].injection_below);

        // Never both flags on a kept row.
        assert!(eval
            .rows
            .iter()
            .all(|r| !(r.infusion_below && r.injection_below)));
    }

    #[test]
    fn one_port_rows_have_zero_injection_peak() {
        let table = one_port(&[0.005, 0.9, 0.005, 0.3]);
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();
        assert!(eval.one_port);
        assert!(eval.rows.iter().all(|r| r.injection_peak == 0.0));
        assert!(eval.rows.iter().all(|r| r.injection_below));
    }

    #[test]
    fn dead_injection_channel_reclassifies_as_one_port() {
        // Injection never reaches its minimum while infusion always passes.
        let table = two_port(&[0.005, 0.9, 0.005, 0.8], &[0.005, 0.02, 0.005, 0.03]);
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();

        assert!(eval.one_port);
        assert_eq!(eval.rows.len(), 2);
        assert!(eval.notes.iter().any(|n| n.contains("One port file")));
    }

    #[test]
    fn more_than_fifteen_cycles_warns_but_succeeds() {
        let mut tail = Vec::new();
        for _ in 0..16 {
            tail.push(0.005);
            tail.push(0.9);
        }
        let table = one_port(&tail);
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();

        assert_eq!(eval.rows.len(), 16);
        assert!(eval.notes.iter().any(|n| n.contains("more than 15")));
    }

    #[test]
    fn exactly_k_crossings_make_k_cycles() {
        for k in 1..6 {
            let mut tail = Vec::new();
            for _ in 0..k {
                tail.push(0.005);
                tail.push(0.9);
                tail.push(0.5);
            }
            let table = one_port(&tail);
            let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();
            assert_eq!(eval.rows.len(), k, "k = {k}");
        }
    }

    #[test]
    fn limits_come_from_the_untrimmed_head() {
        let mut infusion = vec![Some(0.11), Some(0.77)];
        infusion.extend(vec![Some(0.0); WARMUP_ROWS]);
        infusion.extend([Some(0.005), Some(0.9)].iter().copied());
        let table = MeasurementTable {
            infusion,
            injection: None,
        };
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();

        assert_eq!(eval.limits.infusion, (0.11, 0.77));
        assert_eq!(eval.limits.injection, (0.0, 0.0));
    }

    #[test]
    fn shorter_injection_channel_is_clamped() {
        // Infusion's list [0, 3] is shorter than injection's [0, 1, 2] and
        // wins; the injection channel ends before the second cycle begins,
        // so that cycle is empty, never passes, and annotates 0.0. With no
        // injection cycle passing at all the file also reclassifies as
        // one-port.
        let table = MeasurementTable {
            infusion: with_warmup(&[0.005, 0.9, 0.8, 0.005, 0.7]),
            injection: Some(with_warmup(&[0.005, 0.002, 0.003])),
        };
        let eval = evaluate("m.xlsx", &table, &thresholds(0.01, 0.2, 0.1)).unwrap();

        assert_eq!(eval.rows.len(), 2);
        assert_eq!(eval.rows[1].injection_peak, 0.0);
        assert!(eval.rows[1].injection_below);
        assert!(eval.one_port);
    }
}
