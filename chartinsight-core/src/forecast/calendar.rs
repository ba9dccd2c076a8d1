//! Business-day calendar for dating forecast steps.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The next `count` Monday-to-Friday dates strictly after `after`.
/// Exchange holidays are not modelled.
pub fn next_business_days(after: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut day = after;
    while dates.len() < count {
        day += Duration::days(1);
        if is_business_day(day) {
            dates.push(day);
        }
    }
    dates
}
