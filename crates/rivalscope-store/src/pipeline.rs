//! Aggregation pipelines: match, project, group, sort and limit stages
//! evaluated in order over a stream of documents.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use crate::filter::{compare_values, Expr, Filter};
use crate::types::{Fields, ID_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Per-group accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Count,
    /// Number of group members matching the predicate.
    CountIf(Filter),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    /// Replace each row with `_id` plus the computed attributes.
    Project(Vec<(String, Expr)>),
    /// Group by `key` (missing keys form a null group); rows come out in
    /// first-encounter order with the key under `_id`.
    Group {
        key: Expr,
        accumulators: Vec<(String, Accumulator)>,
    },
    /// Stable sort on one attribute.
    Sort(String, Direction),
    Limit(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn project(mut self, name: &str, expr: Expr) -> Self {
        self.stages.push(Stage::Project(vec![(name.to_string(), expr)]));
        self
    }

    pub fn group(mut self, key: Expr, accumulators: Vec<(&str, Accumulator)>) -> Self {
        self.stages.push(Stage::Group {
            key,
            accumulators: accumulators
                .into_iter()
                .map(|(name, acc)| (name.to_string(), acc))
                .collect(),
        });
        self
    }

    pub fn sort(mut self, field: &str, direction: Direction) -> Self {
        self.stages.push(Stage::Sort(field.to_string(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.stages.push(Stage::Limit(n));
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The leading `Match` stage's filter, which a backend may push down.
    pub fn leading_filter(&self) -> Option<&Filter> {
        match self.stages.first() {
            Some(Stage::Match(f)) => Some(f),
            _ => None,
        }
    }

    /// Run every stage over `rows` (documents with `_id` present).
    pub fn run(&self, rows: impl IntoIterator<Item = Fields>) -> Vec<Fields> {
        let mut current: Vec<Fields> = rows.into_iter().collect();
        for stage in &self.stages {
            current = match stage {
                Stage::Match(filter) => current.into_iter().filter(|r| filter.matches(r)).collect(),
                Stage::Project(exprs) => current.iter().map(|r| project_row(r, exprs)).collect(),
                Stage::Group { key, accumulators } => group_rows(&current, key, accumulators),
                Stage::Sort(field, direction) => {
                    current.sort_by(|a, b| {
                        let ord = sort_key_cmp(a.get(field), b.get(field));
                        match direction {
                            Direction::Ascending => ord,
                            Direction::Descending => ord.reverse(),
                        }
                    });
                    current
                }
                Stage::Limit(n) => {
                    current.truncate(*n);
                    current
                }
            };
        }
        current
    }
}

fn project_row(row: &Fields, exprs: &[(String, Expr)]) -> Fields {
    let mut out = Fields::new();
    if let Some(id) = row.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for (name, expr) in exprs {
        out.insert(name.clone(), expr.eval(row).unwrap_or(Value::Null));
    }
    out
}

fn group_rows(rows: &[Fields], key: &Expr, accumulators: &[(String, Accumulator)]) -> Vec<Fields> {
    let mut order: Vec<Value> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<Vec<u64>> = Vec::new();

    for row in rows {
        let group_key = key.eval(row).unwrap_or(Value::Null);
        let slot = *index.entry(group_key.to_string()).or_insert_with(|| {
            order.push(group_key.clone());
            totals.push(vec![0; accumulators.len()]);
            order.len() - 1
        });
        for (i, (_, acc)) in accumulators.iter().enumerate() {
            let hit = match acc {
                Accumulator::Count => true,
                Accumulator::CountIf(filter) => filter.matches(row),
            };
            if hit {
                totals[slot][i] += 1;
            }
        }
    }

    order
        .into_iter()
        .zip(totals)
        .map(|(group_key, counts)| {
            let mut out = Fields::new();
            out.insert(ID_FIELD.to_string(), group_key);
            for ((name, _), count) in accumulators.iter().zip(counts) {
                out.insert(name.clone(), Value::from(count));
            }
            out
        })
        .collect()
}

/// Nulls and missing values sort first; mixed kinds keep their relative order.
fn sort_key_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
    }
}
