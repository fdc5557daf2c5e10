//! Loads an itemized claim sheet from CSV.
//!
//! One row per line of the claim. The `kind` column says which list the row
//! belongs to; the remaining columns are read as raw text and checked later
//! by [`ItemizedClaimForm::validate`], so a bad number is reported with its
//! field path rather than as a CSV error.
//!
//! | Column             | Used by              |
//! |--------------------|----------------------|
//! | `kind`             | all: `item`, `variation` or `credit` |
//! | `description`      | all                  |
//! | `contract_value`   | item                 |
//! | `percent_complete` | item                 |
//! | `quantity`         | variation            |
//! | `rate`             | variation            |
//! | `amount`           | credit               |
//!
//! Headers are matched by name and columns a sheet does not use may be
//! left out.
//!
//! ```csv
//! kind,description,contract_value,percent_complete,quantity,rate,amount
//! item,Site establishment,25000.00,100,,,
//! item,Formwork,180000.00,45,,,
//! variation,Extra footings,,,12,850.00,
//! credit,Unused provisional sum,,,,,3000.00
//! ```

use std::path::{Path, PathBuf};

use claim_core::input::{
    ClaimHeaderForm, ClaimItemForm, CreditForm, ItemizedClaimForm, VariationForm,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SheetRow {
    kind: String,
    description: String,
    contract_value: String,
    percent_complete: String,
    quantity: String,
    rate: String,
    amount: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SheetLoadError {
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// `row` is 1-based, not counting the header.
    #[error("unknown row kind '{kind}' on row {row}, expected item, variation or credit")]
    UnknownKind { kind: String, row: usize },

    #[error("cannot read sheet '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The rows of an itemized claim sheet, in file order within each list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSheet {
    pub items: Vec<ClaimItemForm>,
    pub variations: Vec<VariationForm>,
    pub credits: Vec<CreditForm>,
}

impl ClaimSheet {
    pub fn into_form(
        self,
        header: ClaimHeaderForm,
        payment_received: String,
    ) -> ItemizedClaimForm {
        ItemizedClaimForm {
            header,
            items: self.items,
            variations: self.variations,
            credits: self.credits,
            payment_received,
        }
    }

    fn push(
        &mut self,
        row: SheetRow,
        row_number: usize,
    ) -> Result<(), SheetLoadError> {
        match row.kind.to_ascii_lowercase().as_str() {
            "item" => self.items.push(ClaimItemForm {
                description: row.description,
                contract_value: row.contract_value,
                percent_complete: row.percent_complete,
            }),
            "variation" => self.variations.push(VariationForm {
                description: row.description,
                quantity: row.quantity,
                rate: row.rate,
            }),
            "credit" => self.credits.push(CreditForm {
                description: row.description,
                amount: row.amount,
            }),
            _ => {
                return Err(SheetLoadError::UnknownKind {
                    kind: row.kind,
                    row: row_number,
                });
            }
        }
        Ok(())
    }
}

pub fn load_from_str(input: &str) -> Result<ClaimSheet, SheetLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    let mut sheet = ClaimSheet::default();
    for (idx, result) in reader.deserialize::<SheetRow>().enumerate() {
        sheet.push(result?, idx + 1)?;
    }

    debug!(
        items = sheet.items.len(),
        variations = sheet.variations.len(),
        credits = sheet.credits.len(),
        "claim sheet loaded"
    );
    Ok(sheet)
}

pub fn load_from_file(path: &Path) -> Result<ClaimSheet, SheetLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SheetLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents)
}
