//! Load configuration

use serde::{Deserialize, Serialize};

use crate::document::ParseOptions;

/// What to do with a source that lacks the requested table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTablePolicy {
    /// Fail the load with `MissingTable`
    #[default]
    Error,
    /// Skip the source and record it on the report
    Skip,
}

/// How sources are parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    #[default]
    Sequential,
    /// Parse on a dedicated pool of `workers` threads
    Parallel { workers: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub parse: ParseOptions,
    pub missing_table: MissingTablePolicy,
    pub parallelism: Parallelism,
    /// Project the merged table onto these columns, in this order
    pub columns: Option<Vec<String>>,
}

impl LoadOptions {
    pub fn validate(&self) -> Result<(), String> {
        self.parse.validate()?;

        if let Parallelism::Parallel { workers: 0 } = self.parallelism {
            return Err("parallel loading needs at least one worker".into());
        }

        if let Some(columns) = &self.columns {
            if columns.is_empty() {
                return Err("column selection is empty".into());
            }
            for (i, column) in columns.iter().enumerate() {
                if columns[..i].contains(column) {
                    return Err(format!("column '{}' selected twice", column));
                }
            }
        }

        Ok(())
    }
}
