//! Age at measurement.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

const MS_PER_YEAR: f64 = 1000.0 * 60.0 * 60.0 * 24.0 * 365.25;

/// Age in years at `at`, rounded to one decimal.
///
/// Negative when the measurement predates the birth date; callers decide
/// whether that matters.
#[must_use]
pub fn age_in_years(birth: NaiveDate, at: NaiveDateTime) -> f64 {
    let Some(birth_start) = birth.and_hms_opt(0, 0, 0) else {
        return 0.0;
    };
    #[allow(clippy::cast_precision_loss)]
    let years = (at - birth_start).num_milliseconds() as f64 / MS_PER_YEAR;
    (years * 10.0).round() / 10.0
}

/// Age as whole years and months, e.g. `4岁3个月`.
#[must_use]
pub fn age_label(birth: NaiveDate, at: NaiveDateTime) -> String {
    let date = at.date();
    let mut years = date.year() - birth.year();
    let mut months = i64::from(date.month()) - i64::from(birth.month());

    if date.day() < birth.day() {
        months -= 1;
    }
    if months < 0 {
        years -= 1;
        months += 12;
    }

    format!("{years}岁{months}个月")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_in_years() {
        let birth = date(2020, 1, 1);
        let at = date(2024, 7, 1).and_hms_opt(0, 0, 0).unwrap();
        assert!((age_in_years(birth, at) - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_age_label_borrows_month() {
        let birth = date(2020, 5, 20);
        let at = date(2024, 8, 10).and_hms_opt(9, 0, 0).unwrap();
        assert_eq!(age_label(birth, at), "4岁2个月");
    }

    #[test]
    fn test_age_label_borrows_year() {
        let birth = date(2020, 11, 1);
        let at = date(2024, 3, 1).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(age_label(birth, at), "3岁4个月");
    }
}
