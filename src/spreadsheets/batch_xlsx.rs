use crate::domain::sevis::BatchSummary;
use crate::errors::ServerError;
use crate::responses::{xlsx_response, ResultResp};
use crate::spreadsheets::write_text_row;
use rust_xlsxwriter::Workbook;

pub fn export_batch_xlsx(summary: &BatchSummary) -> ResultResp {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    write_text_row(worksheet, 0, &["Batch", "Status", "Participant", "Student", "Change Item", "Result", "Message"])?;

    for (i, p) in summary.participants.iter().enumerate() {
        write_text_row(
            worksheet,
            (i + 1) as u32,
            &[
                summary.batch.name.as_str(),
                summary.batch.status.as_str(),
                p.id.as_str(),
                p.student_id.as_str(),
                p.item_id.as_str(),
                p.result.as_str(),
                p.message.as_deref().unwrap_or(""),
            ],
        )?;
    }

    let buffer = workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {e}")))?;

    xlsx_response(buffer, &format!("sevis_batch_{}.xlsx", summary.batch.id))
}
