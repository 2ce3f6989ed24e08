use estat_market::nowcast::{self, NowcastMethod, cumulative_growth};
use estat_market::{AnnualSeries, stats};

fn history() -> AnnualSeries {
    AnnualSeries::from_points([(2018, 900.0), (2019, 950.0), (2020, 1000.0)])
}

#[test]
fn cumulative_growth_compounds_sub_period_rates() {
    let growth = [Some(2.0), Some(-1.0), Some(3.0)];
    let (projected, rate) = cumulative_growth(1000.0, &growth);
    assert!((projected - 1040.094).abs() < 1e-9);
    assert!((rate - 0.040094).abs() < 1e-9);

    let s = nowcast::apply(&history(), &growth, NowcastMethod::Cumulative, 0.3);
    assert!(s.is_nowcast());
    assert_eq!(s.latest().map(|(y, _)| y), Some(2021));
    assert!((s.get(2021).unwrap() - 1040.09).abs() < 0.01);
}

#[test]
fn missing_growth_entries_count_as_zero() {
    let (projected, _) = cumulative_growth(1000.0, &[Some(10.0), None]);
    assert!((projected - 1100.0).abs() < 1e-9);
}

#[test]
fn history_is_never_altered() {
    let before = history();
    let after = nowcast::apply(&before, &[Some(5.0)], NowcastMethod::Cumulative, 0.3);
    for (year, value) in before.iter() {
        assert_eq!(after.get(year), Some(value));
    }
    assert_eq!(after.len(), before.len() + 1);
    assert!(!before.is_nowcast());
}

#[test]
fn reapplying_gives_the_same_projection() {
    let growth = [Some(2.0), Some(-1.0), Some(3.0)];
    let once = nowcast::apply(&history(), &growth, NowcastMethod::Cumulative, 0.3);
    let twice = nowcast::apply(&once, &growth, NowcastMethod::Cumulative, 0.3);
    assert_eq!(once, twice);

    let once = nowcast::apply(&history(), &[], NowcastMethod::Smoothed, 0.3);
    let twice = nowcast::apply(&once, &[], NowcastMethod::Smoothed, 0.3);
    assert_eq!(once, twice);
}

#[test]
fn empty_series_is_a_no_op() {
    let empty = AnnualSeries::new();
    let out = nowcast::apply(&empty, &[Some(1.0)], NowcastMethod::Cumulative, 0.3);
    assert!(out.is_empty());
    assert!(!out.is_nowcast());
}

#[test]
fn cumulative_without_growth_falls_back_to_smoothing() {
    let s = AnnualSeries::from_points([(2019, 1000.0), (2020, 1200.0)]);
    let cumulative = nowcast::apply(&s, &[], NowcastMethod::Cumulative, 0.3);
    let smoothed = nowcast::apply(&s, &[], NowcastMethod::Smoothed, 0.3);
    assert_eq!(cumulative, smoothed);
    // (0.7 * 1000 + 1200) / (0.7 + 1)
    let expected = 1900.0 / 1.7;
    assert!((smoothed.get(2021).unwrap() - expected).abs() < 1e-9);
}

#[test]
fn zero_latest_value_projects_zero() {
    let s = AnnualSeries::from_points([(2019, 10.0), (2020, 0.0)]);
    let out = nowcast::apply(&s, &[Some(5.0)], NowcastMethod::Cumulative, 0.3);
    assert_eq!(out.get(2021), Some(0.0));
    assert_eq!(cumulative_growth(0.0, &[Some(5.0)]).1, 0.0);
}

#[test]
fn kpis_on_nowcast_series_use_projection() {
    let s = nowcast::apply(&history(), &[Some(10.0)], NowcastMethod::Cumulative, 0.3);
    let k = stats::compute(&s).unwrap();
    assert_eq!(k.latest_year, 2021);
    assert!((k.yoy.unwrap() - 0.1).abs() < 1e-9);
}

#[test]
fn single_point_cagr_uses_span_of_one() {
    let s = AnnualSeries::from_points([(2020, 500.0)]);
    let k = stats::compute(&s).unwrap();
    assert_eq!(k.latest_year, 2020);
    assert_eq!(k.latest_value, 500.0);
    assert_eq!(k.yoy, None);
    assert_eq!(k.cagr, Some(0.0));
}

#[test]
fn zero_baseline_cagr_is_undefined() {
    let s = AnnualSeries::from_points([(2018, 0.0), (2019, 100.0), (2020, 120.0)]);
    let k = stats::compute(&s).unwrap();
    assert_eq!(k.cagr, None);
    assert!((k.yoy.unwrap() - 0.2).abs() < 1e-12);
}

#[test]
fn zero_previous_year_yoy_is_undefined() {
    let s = AnnualSeries::from_points([(2018, 50.0), (2019, 0.0), (2020, 120.0)]);
    let k = stats::compute(&s).unwrap();
    assert_eq!(k.yoy, None);
    assert!(k.cagr.is_some());
}

#[test]
fn empty_series_has_no_kpis() {
    assert_eq!(stats::compute(&AnnualSeries::new()), None);
}
