use std::collections::HashMap;

use crate::error::{PipelineError, Result};
use crate::models::raw_table::RawTable;

/// One expected column of a source format.
#[derive(Debug, Clone, Copy)]
pub struct SourceColumn {
    pub name: &'static str,
    pub required: bool,
}

pub const fn required(name: &'static str) -> SourceColumn {
    SourceColumn {
        name,
        required: true,
    }
}

pub const fn optional(name: &'static str) -> SourceColumn {
    SourceColumn {
        name,
        required: false,
    }
}

/// Expected column set of a source format, resolved against an actual table
/// before any cell access. A missing required column fails the whole file
/// up front instead of surfacing as scattered absent-cell handling.
#[derive(Debug, Clone, Copy)]
pub struct SourceSchema {
    pub source: &'static str,
    pub columns: &'static [SourceColumn],
}

impl SourceSchema {
    pub fn resolve(&self, table: &RawTable, file: &str) -> Result<ResolvedColumns> {
        let mut indices = HashMap::new();
        for column in self.columns {
            match table.column_index(column.name) {
                Some(idx) => {
                    indices.insert(column.name, idx);
                }
                None if column.required => {
                    return Err(PipelineError::file_parse(
                        file,
                        format!(
                            "{} report is missing required column '{}'",
                            self.source, column.name
                        ),
                    ));
                }
                None => {}
            }
        }
        Ok(ResolvedColumns { indices })
    }
}

/// Column indices resolved for one concrete table.
#[derive(Debug, Clone)]
pub struct ResolvedColumns {
    indices: HashMap<&'static str, usize>,
}

impl ResolvedColumns {
    pub fn index(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Cell lookup through the resolved mapping; `None` when the column is
    /// absent or the cell is empty.
    pub fn cell<'a>(&self, table: &'a RawTable, row: usize, name: &str) -> Option<&'a str> {
        self.index(name).and_then(|col| table.cell(row, col))
    }
}
