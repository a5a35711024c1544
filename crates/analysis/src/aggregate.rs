use std::collections::BTreeMap;

use crate::model::{EntityDataPoint, IqrBounds, ParetoPoint, Value};

/// Key used for rows whose category (or source) cell is blank.
pub const UNKNOWN_ENTITY: &str = "Unknown";

/// Pareto chart length.
pub const MAX_PARETO_ENTITIES: usize = 30;

/// An entity dominating more than this share of rows is flagged...
pub const CONCENTRATION_SHARE: f64 = 0.10;
/// ...but only once the dataset is larger than this.
pub const CONCENTRATION_MIN_ROWS: usize = 50;

/// Grouping key for a category/source cell.
pub fn entity_key(value: Option<&Value>) -> String {
    match value {
        Some(v) if !v.is_blank() => v.display(),
        _ => UNKNOWN_ENTITY.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EntityTotals {
    count: usize,
    total: f64,
}

/// Per-category totals, accumulated during the row pass.
#[derive(Debug, Default)]
pub struct EntityClusterer {
    entities: BTreeMap<String, EntityTotals>,
}

impl EntityClusterer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, entity: String, amount: f64) {
        let totals = self.entities.entry(entity).or_default();
        totals.count += 1;
        totals.total += amount;
    }

    /// Entities in key order. Flagged when the average is above the global
    /// upper fence, or when the entity holds more than 10% of rows in a
    /// dataset of more than 50 rows.
    pub fn finish(self, bounds: Option<&IqrBounds>, valid_rows: usize) -> Vec<EntityDataPoint> {
        let concentration_limit = valid_rows as f64 * CONCENTRATION_SHARE;
        self.entities
            .into_iter()
            .map(|(id, totals)| {
                let average_amount = totals.total / totals.count as f64;
                let above_fence = bounds.is_some_and(|b| average_amount > b.upper);
                let concentrated = valid_rows > CONCENTRATION_MIN_ROWS
                    && totals.count as f64 > concentration_limit;
                EntityDataPoint {
                    id,
                    count: totals.count,
                    total_amount: totals.total,
                    average_amount,
                    is_outlier: above_fence || concentrated,
                }
            })
            .collect()
    }
}

/// Rank entities by total amount with a running cumulative share of the grand total.
pub fn pareto(entities: &[EntityDataPoint]) -> Vec<ParetoPoint> {
    let mut ranked: Vec<&EntityDataPoint> = entities.iter().collect();
    ranked.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));

    let grand_total: f64 = entities.iter().map(|e| e.total_amount).sum();
    let mut running = 0.0;

    ranked
        .into_iter()
        .take(MAX_PARETO_ENTITIES)
        .map(|e| {
            running += e.total_amount;
            let cumulative_percentage = if grand_total != 0.0 {
                running / grand_total * 100.0
            } else {
                0.0
            };
            ParetoPoint {
                name: e.id.clone(),
                value: e.total_amount,
                cumulative_percentage,
            }
        })
        .collect()
}
