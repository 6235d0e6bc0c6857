//! Frame assembly from a batch of items

use std::collections::HashMap;

use dynq_core::{DatetimeFormat, Frame, Result, SourceRow};
use indexmap::IndexMap;

use crate::attribute::Attribute;

/// Incrementally builds a [`Frame`] from rows
///
/// Columns appear in the order their attributes are first seen. After each
/// row every column is padded so all columns stay the same length.
#[derive(Debug, Default)]
pub struct FrameBuilder {
    name: String,
    hints: HashMap<String, DatetimeFormat>,
    attributes: IndexMap<String, Attribute>,
    rows: usize,
}

impl FrameBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Datetime interpretation per attribute name
    pub fn with_hints(mut self, hints: HashMap<String, DatetimeFormat>) -> Self {
        self.hints = hints;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Add one row; errors name the attribute and 0-based row index
    pub fn push_row(&mut self, row: &SourceRow) -> Result<()> {
        let row_index = self.rows;

        for (name, value) in row {
            let context = || format!("attribute {} at row {}", name, row_index);

            match self.attributes.get_mut(name) {
                Some(attribute) => attribute.append(value).map_err(|e| e.context(context()))?,
                None => {
                    let hint = self.hints.get(name).cloned();
                    if let Some(attribute) = Attribute::new(row_index, name.clone(), value, hint)
                        .map_err(|e| e.context(context()))?
                    {
                        self.attributes.insert(name.clone(), attribute);
                    }
                }
            }
        }

        for attribute in self.attributes.values_mut() {
            if attribute.size() != row_index + 1 {
                attribute.pad();
            }
        }

        self.rows += 1;
        Ok(())
    }

    pub fn finish(self) -> Frame {
        let mut diagnostics = Vec::new();
        let columns = self
            .attributes
            .into_values()
            .map(|mut attribute| {
                diagnostics.extend(attribute.take_diagnostics());
                attribute.into_column()
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            frame = %self.name,
            rows = self.rows,
            columns = columns.len(),
            diagnostics = diagnostics.len(),
            "frame assembled"
        );

        Frame {
            name: self.name,
            columns,
            row_count: self.rows,
            diagnostics,
        }
    }
}

/// Build a frame named `name` from `rows` in one pass
pub fn build_frame(
    name: impl Into<String>,
    rows: &[SourceRow],
    hints: HashMap<String, DatetimeFormat>,
) -> Result<Frame> {
    let mut builder = FrameBuilder::new(name).with_hints(hints);
    for row in rows {
        builder.push_row(row)?;
    }
    Ok(builder.finish())
}
