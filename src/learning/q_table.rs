// q_table.rs
//
// Value table over (encoded state, action). Stored sparsely: rows that were
// never written read as zero, so the full 11-dimensional array never has to
// be materialised.

use crate::control_system::traffic_light_controller::Action;
use crate::flow_analyzer::state_encoder::EncodedState;
use crate::global_variables::{ACTION_COUNT, STATE_ARITY, STATE_DIMENSIONS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// On-disk form: the full array shape (state dimensions followed by the
/// action count) and the non-zero rows keyed by their row-major flat index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFile {
    pub shape: Vec<usize>,
    pub entries: Vec<(usize, [f64; ACTION_COUNT])>,
}

/// Why a table file could not be adopted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableMismatch {
    Shape { expected: Vec<usize>, found: Vec<usize> },
    EntryOutOfRange(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    dims: [usize; STATE_ARITY],
    rows: HashMap<usize, [f64; ACTION_COUNT]>,
}

impl Default for QTable {
    fn default() -> Self {
        Self::new()
    }
}

impl QTable {
    pub fn new() -> Self {
        Self {
            dims: STATE_DIMENSIONS,
            rows: HashMap::new(),
        }
    }

    /// State dimensions followed by the action count.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = self.dims.to_vec();
        shape.push(ACTION_COUNT);
        shape
    }

    fn row_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Clamps every coordinate into `[0, dim - 1]` and flattens row-major.
    pub fn flat_index(&self, index: [usize; STATE_ARITY]) -> usize {
        let mut flat = 0;
        for (value, dim) in index.iter().zip(self.dims.iter()) {
            flat = flat * dim + (*value).min(dim - 1);
        }
        flat
    }

    pub fn row(&self, state: &EncodedState) -> [f64; ACTION_COUNT] {
        let flat = self.flat_index(state.to_index());
        self.rows.get(&flat).copied().unwrap_or([0.0; ACTION_COUNT])
    }

    pub fn get(&self, state: &EncodedState, action: Action) -> f64 {
        self.row(state)[action.index()]
    }

    pub fn set(&mut self, state: &EncodedState, action: Action, value: f64) {
        let flat = self.flat_index(state.to_index());
        self.rows.entry(flat).or_insert([0.0; ACTION_COUNT])[action.index()] = value;
    }

    pub fn max_value(&self, state: &EncodedState) -> f64 {
        self.row(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Highest-valued action; ties go to the lowest action index.
    pub fn best_action(&self, state: &EncodedState) -> Action {
        let row = self.row(state);
        let mut best = Action::ALL[0];
        for action in Action::ALL.iter().skip(1) {
            if row[action.index()] > row[best.index()] {
                best = *action;
            }
        }
        best
    }

    /// Number of states that have been written at least once.
    pub fn visited_states(&self) -> usize {
        self.rows.len()
    }

    pub fn to_file(&self) -> TableFile {
        let mut entries: Vec<_> = self
            .rows
            .iter()
            .filter(|(_, values)| values.iter().any(|v| *v != 0.0))
            .map(|(index, values)| (*index, *values))
            .collect();
        entries.sort_by_key(|(index, _)| *index);
        TableFile {
            shape: self.shape(),
            entries,
        }
    }

    /// Adopts a table file only if its shape matches exactly and every entry
    /// addresses a valid row.
    pub fn from_file(file: TableFile) -> Result<Self, TableMismatch> {
        let mut table = QTable::new();
        let expected = table.shape();
        if file.shape != expected {
            return Err(TableMismatch::Shape {
                expected,
                found: file.shape,
            });
        }
        let rows = table.row_count();
        for (index, values) in file.entries {
            if index >= rows {
                return Err(TableMismatch::EntryOutOfRange(index));
            }
            table.rows.insert(index, values);
        }
        Ok(table)
    }
}
