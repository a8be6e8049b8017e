pub mod batch_xlsx;
pub mod change_queue_xlsx;

pub use batch_xlsx::export_batch_xlsx;
pub use change_queue_xlsx::export_change_queue_xlsx;

use crate::errors::ServerError;
use rust_xlsxwriter::Worksheet;

/// Writes one row of text cells starting at column 0.
pub(crate) fn write_text_row<S: AsRef<str>>(ws: &mut Worksheet, row: u32, cells: &[S]) -> Result<(), ServerError> {
    for (col, cell) in cells.iter().enumerate() {
        ws.write_string(row, col as u16, cell.as_ref())
            .map_err(|e| ServerError::XlsxError(format!("row {row}, column {col}: {e}")))?;
    }
    Ok(())
}
