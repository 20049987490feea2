use chrono::{Datelike, Duration, NaiveDate};

pub const GRID_CELLS: usize = 42;
pub const GRID_COLS: usize = 7;
pub const GRID_ROWS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthDayCell {
    pub date: NaiveDate,
    pub iso: String,
    pub in_current_month: bool,
}

/// Returns the 42-cell grid (6 weeks of 7 days) covering the month of
/// `reference`, starting from the first Sunday on or before the 1st.
pub fn build_month_grid(reference: NaiveDate) -> Vec<MonthDayCell> {
    let first = first_of_month(reference);
    let back = first.weekday().num_days_from_sunday() as i64;
    let grid_start = first - Duration::days(back);

    (0..GRID_CELLS as i64)
        .map(|offset| {
            let date = grid_start + Duration::days(offset);
            MonthDayCell {
                date,
                iso: date.format("%Y-%m-%d").to_string(),
                in_current_month: date.month() == reference.month()
                    && date.year() == reference.year(),
            }
        })
        .collect()
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

pub fn prev_month(date: NaiveDate) -> NaiveDate {
    first_of_month(first_of_month(date) - Duration::days(1))
}

pub fn next_month(date: NaiveDate) -> NaiveDate {
    let first = first_of_month(date);
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn grid_always_has_42_contiguous_cells() {
        for (y, m) in [(2024, 2), (2024, 3), (2024, 12), (2025, 1), (1999, 6)] {
            let days = build_month_grid(date(y, m, 15));
            assert_eq!(days.len(), GRID_CELLS);
            for pair in days.windows(2) {
                assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
            }
        }
    }

    #[test]
    fn grid_starts_on_a_sunday() {
        for (y, m) in [(2024, 3), (2023, 10), (2026, 1), (2024, 9)] {
            let days = build_month_grid(date(y, m, 1));
            assert_eq!(days[0].date.weekday(), Weekday::Sun);
        }
    }

    #[test]
    fn second_week_occupies_indices_7_through_13() {
        let days = build_month_grid(date(2024, 3, 10));
        assert_eq!(days[7].date.weekday(), Weekday::Sun);
        for (offset, cell) in days[7..14].iter().enumerate() {
            assert_eq!(cell.date, days[7].date + Duration::days(offset as i64));
        }
    }

    #[test]
    fn march_2024_grid_boundaries() {
        // March 1st 2024 is a Friday, so the grid opens on Sunday Feb 25.
        let days = build_month_grid(date(2024, 3, 10));
        assert_eq!(days[0].date, date(2024, 2, 25));
        assert_eq!(days[0].iso, "2024-02-25");
        assert!(!days[0].in_current_month);
        assert_eq!(days[5].date, date(2024, 3, 1));
        assert!(days[5].in_current_month);
        assert!(days[41].date >= date(2024, 3, 31));
    }

    #[test]
    fn in_current_month_tracks_the_reference_month() {
        let days = build_month_grid(date(2024, 3, 10));
        for cell in &days {
            assert_eq!(cell.in_current_month, cell.date.month() == 3);
        }
    }

    #[test]
    fn month_navigation_wraps_year_boundaries() {
        assert_eq!(prev_month(date(2024, 1, 20)), date(2023, 12, 1));
        assert_eq!(next_month(date(2023, 12, 5)), date(2024, 1, 1));
        assert_eq!(next_month(date(2024, 3, 31)), date(2024, 4, 1));
    }
}
