//! Command-line field edits
//!
//! `--edit 2:date=2024/01/05` sets `date` on the second image given.

use std::str::FromStr;

/// One `N:FIELD=VALUE` edit (N is 1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub index: usize,
    pub field: String,
    pub value: String,
}

impl FromStr for FieldEdit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (index, assignment) = s
            .split_once(':')
            .ok_or_else(|| format!("expected N:FIELD=VALUE, got '{}'", s))?;
        let index: usize = index
            .trim()
            .parse()
            .map_err(|_| format!("invalid item number '{}'", index))?;
        if index == 0 {
            return Err("item numbers start at 1".to_string());
        }

        let (field, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", assignment))?;
        let field = field.trim();
        if field.is_empty() {
            return Err("field name must not be blank".to_string());
        }

        Ok(Self {
            index,
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}
