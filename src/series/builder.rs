use crate::core::{EntitySelector, SalesTable, WeeklySeries, WEEKS_PER_YEAR};
use crate::error::{ForecastError, Result};
use std::collections::BTreeMap;

/// Builder turning raw observations into one weekly series.
///
/// # Example
///
/// ```
/// use weekcast::core::{EntitySelector, Observation, SalesTable};
/// use weekcast::series::SeriesBuilder;
///
/// let table = SalesTable::new(vec![
///     Observation::new("a", 1, 10.0),
///     Observation::new("a", 2, 12.0),
///     Observation::new("b", 1, 5.0),
///     Observation::new("b", 2, 6.0),
/// ])
/// .unwrap();
///
/// let total = SeriesBuilder::new(&table).build().unwrap();
/// assert_eq!(total.values(), &[15.0, 18.0]);
///
/// let store = SeriesBuilder::new(&table)
///     .selector(EntitySelector::entity("b"))
///     .up_to_week(1)
///     .build()
///     .unwrap();
/// assert_eq!(store.values(), &[5.0]);
/// ```
#[derive(Debug, Clone)]
pub struct SeriesBuilder<'a> {
    table: &'a SalesTable,
    selector: EntitySelector,
    up_to_week: Option<u32>,
    period: usize,
}

impl<'a> SeriesBuilder<'a> {
    /// Aggregate of all entities, unbounded, yearly seasonality.
    pub fn new(table: &'a SalesTable) -> Self {
        Self {
            table,
            selector: EntitySelector::All,
            up_to_week: None,
            period: WEEKS_PER_YEAR,
        }
    }

    pub fn selector(mut self, selector: EntitySelector) -> Self {
        self.selector = selector;
        self
    }

    /// Ignore observations after `week` (the "actual data up to now" cut).
    pub fn up_to_week(mut self, week: u32) -> Self {
        self.up_to_week = Some(week);
        self
    }

    /// Optional form of [`SeriesBuilder::up_to_week`].
    pub fn up_to(mut self, week: Option<u32>) -> Self {
        self.up_to_week = week;
        self
    }

    pub fn period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }

    fn within_bound(&self, week: u32) -> bool {
        self.up_to_week.map_or(true, |bound| week <= bound)
    }

    /// Build the series, failing on empty selections and gaps.
    pub fn build(self) -> Result<WeeklySeries> {
        let rows: Vec<(u32, f64)> = match &self.selector {
            EntitySelector::Entity(id) => self
                .table
                .rows(id)
                .ok_or_else(|| ForecastError::UnknownEntity(id.clone()))?
                .iter()
                .copied()
                .filter(|&(week, _)| self.within_bound(week))
                .collect(),
            EntitySelector::All => {
                let mut totals: BTreeMap<u32, f64> = BTreeMap::new();
                for (_, entity_rows) in self.table.iter() {
                    for &(week, sales) in entity_rows {
                        if self.within_bound(week) {
                            *totals.entry(week).or_insert(0.0) += sales;
                        }
                    }
                }
                totals.into_iter().collect()
            }
        };

        let Some(&(start_week, _)) = rows.first() else {
            return Err(ForecastError::EmptySeries);
        };

        if let Some(gap) = rows.windows(2).find(|w| w[1].0 != w[0].0 + 1) {
            return Err(ForecastError::SeriesGap {
                selector: self.selector.to_string(),
                after_week: gap[0].0,
                next_week: gap[1].0,
            });
        }

        tracing::debug!(
            selector = %self.selector,
            start_week,
            weeks = rows.len(),
            "built weekly series"
        );

        let values = rows.into_iter().map(|(_, sales)| sales).collect();
        WeeklySeries::new(self.selector.to_string(), start_week, values, self.period)
    }
}
