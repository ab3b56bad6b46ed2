//! Age and date display helpers for pet and vaccine records.

use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PetAge {
    pub years: i32,
    pub months: i32,
}

/// Age in whole years and months on `today`.
///
/// A month only counts once its day of month has been reached.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> PetAge {
    let mut years = today.year() - birth.year();
    let mut months = today.month() as i32 - birth.month() as i32;

    if months < 0 {
        years -= 1;
        months += 12;
    }

    if today.day() < birth.day() {
        months -= 1;
        if months < 0 {
            years -= 1;
            months += 12;
        }
    }

    PetAge { years, months }
}

/// `dd/mm/yyyy`.
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn exact_birthday() {
        assert_eq!(age_on(d(2020, 5, 10), d(2023, 5, 10)), PetAge { years: 3, months: 0 });
    }

    #[test]
    fn day_not_reached_borrows_a_month() {
        assert_eq!(age_on(d(2020, 5, 10), d(2023, 5, 9)), PetAge { years: 2, months: 11 });
    }

    #[test]
    fn earlier_month_borrows_a_year() {
        assert_eq!(age_on(d(2020, 11, 1), d(2023, 2, 1)), PetAge { years: 2, months: 3 });
    }

    #[test]
    fn display_format() {
        assert_eq!(format_display_date(d(2024, 1, 5)), "05/01/2024");
    }
}
