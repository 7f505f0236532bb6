use polars::prelude::*;

use crate::error::SurveyError;
use crate::sanitize::CleanTable;
use crate::schema::{table, yearly};

/// One calendar year of survey rows.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSummary {
    pub year: i32,
    /// Survey rows that year, including rows with no sightings.
    pub count: u32,
    /// Mean sighting rate per category, aligned with `YearlyStats::categories`.
    rates: Vec<f64>,
}

impl YearSummary {
    pub fn rate(&self, category: usize) -> f64 {
        self.rates[category]
    }

    /// Complement of [`rate`](Self::rate), drawn as the upper bar segment.
    pub fn rate_inverse(&self, category: usize) -> f64 {
        1.0 - self.rates[category]
    }

    /// Surveys with a sighting, as shown in the bar annotations.
    pub fn observed(&self, category: usize) -> u32 {
        (self.count as f64 * self.rates[category]).round() as u32
    }
}

/// Per-year survey counts and per-category sighting rates.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyStats {
    categories: Vec<String>,
    /// Ascending by year.
    years: Vec<YearSummary>,
}

impl YearlyStats {
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn years(&self) -> &[YearSummary] {
        &self.years
    }

    pub fn year(&self, year: i32) -> Option<&YearSummary> {
        self.years
            .binary_search_by_key(&year, |s| s.year)
            .ok()
            .map(|i| &self.years[i])
    }

    pub fn category_index(&self, category: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == category)
    }

    pub fn count(&self, year: i32) -> Option<u32> {
        self.year(year).map(|s| s.count)
    }

    pub fn rate(&self, year: i32, category: &str) -> Option<f64> {
        let idx = self.category_index(category)?;
        self.year(year).map(|s| s.rate(idx))
    }

    pub fn rate_inverse(&self, year: i32, category: &str) -> Option<f64> {
        let idx = self.category_index(category)?;
        self.year(year).map(|s| s.rate_inverse(idx))
    }

    pub fn observed_count(&self, year: i32, category: &str) -> Option<u32> {
        let idx = self.category_index(category)?;
        self.year(year).map(|s| s.observed(idx))
    }

    /// First and last year, `None` when there are no rows.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        Some((self.years.first()?.year, self.years.last()?.year))
    }
}

/// Group survey rows by calendar year: row count and mean rate per category.
pub fn yearly_stats(clean: &CleanTable) -> Result<YearlyStats, SurveyError> {
    let categories = clean.categories().to_vec();

    let mut aggs: Vec<Expr> = Vec::with_capacity(categories.len() + 1);
    aggs.push(len().cast(DataType::UInt32).alias(yearly::COUNT));
    for name in &categories {
        aggs.push(col(name.as_str()).mean().alias(name.as_str()));
    }

    let grouped = clean
        .frame()
        .clone()
        .lazy()
        .group_by([col(table::DATE).dt().year().alias(yearly::YEAR)])
        .agg(aggs)
        .sort([yearly::YEAR], SortMultipleOptions::default())
        .collect()?;

    let year_col = grouped.column(yearly::YEAR)?.i32()?;
    let count_col = grouped.column(yearly::COUNT)?.u32()?;
    let rate_cols = categories
        .iter()
        .map(|name| grouped.column(name).and_then(|c| c.f64()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut years = Vec::with_capacity(grouped.height());
    for i in 0..grouped.height() {
        let (Some(year), Some(count)) = (year_col.get(i), count_col.get(i)) else {
            return Err(PolarsError::NoData(format!("null year key in row {i}").into()).into());
        };
        let rates = rate_cols.iter().map(|c| c.get(i).unwrap_or(0.0)).collect();
        years.push(YearSummary { year, count, rates });
    }

    Ok(YearlyStats { categories, years })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawTable;
    use crate::sanitize::sanitize;
    use approx::assert_relative_eq;

    fn clean(rows: &[(&str, f64, f64)]) -> CleanTable {
        let frame = DataFrame::new(vec![
            Column::new(table::SOURCE_ROW.into(), (1..=rows.len() as u32).collect::<Vec<_>>()),
            Column::new(
                table::DATE.into(),
                rows.iter().map(|r| Some(r.0.to_string())).collect::<Vec<_>>(),
            ),
            Column::new("Octopus".into(), rows.iter().map(|r| Some(r.1)).collect::<Vec<_>>()),
            Column::new("Wrasse".into(), rows.iter().map(|r| Some(r.2)).collect::<Vec<_>>()),
        ])
        .unwrap();
        let raw = RawTable::new(frame, vec!["Octopus".into(), "Wrasse".into()]);
        sanitize(&raw, "test").unwrap()
    }

    #[test]
    fn counts_and_rates_per_year() {
        let stats = yearly_stats(&clean(&[
            ("2021-03-01", 1.0, 0.0),
            ("2020-05-01", 1.0, 0.0),
            ("2020-06-11", 0.0, 0.0),
        ]))
        .unwrap();

        assert_eq!(stats.years().iter().map(|s| s.year).collect::<Vec<_>>(), [2020, 2021]);
        assert_eq!(stats.count(2020), Some(2));
        assert_relative_eq!(stats.rate(2020, "Octopus").unwrap(), 0.5);
        assert_relative_eq!(stats.rate_inverse(2020, "Octopus").unwrap(), 0.5);
        assert_eq!(stats.count(2021), Some(1));
        assert_relative_eq!(stats.rate(2021, "Octopus").unwrap(), 1.0);
        assert_relative_eq!(stats.rate_inverse(2021, "Wrasse").unwrap(), 1.0);
        assert_eq!(stats.year_span(), Some((2020, 2021)));
    }

    #[test]
    fn observed_count_rounds() {
        let stats = yearly_stats(&clean(&[
            ("2019-01-01", 1.0, 0.5),
            ("2019-02-01", 1.0, 0.5),
            ("2019-03-01", 0.0, 0.5),
        ]))
        .unwrap();
        assert_eq!(stats.observed_count(2019, "Octopus"), Some(2));
        // 3 * 0.5 = 1.5 rounds away from zero
        assert_eq!(stats.observed_count(2019, "Wrasse"), Some(2));
        assert_eq!(stats.observed_count(2019, "Shark"), None);
        assert_eq!(stats.observed_count(1999, "Octopus"), None);
    }

    #[test]
    fn zero_sighting_rows_still_count() {
        let stats = yearly_stats(&clean(&[
            ("2022-01-01", 0.0, 0.0),
            ("2022-07-01", 0.0, 0.0),
        ]))
        .unwrap();
        assert_eq!(stats.count(2022), Some(2));
        assert_relative_eq!(stats.rate(2022, "Wrasse").unwrap(), 0.0);
    }
}
