use crate::domain::change::ChangeRequest;
use crate::domain::field_path::display_value;
use crate::domain::queue::ChangeRow;
use crate::errors::ServerError;
use crate::responses::{xlsx_response, ResultResp};
use crate::spreadsheets::write_text_row;
use rust_xlsxwriter::Workbook;

const HEADERS: [&str; 11] = [
    "Request",
    "Record Type",
    "Record ID",
    "Requested By",
    "Request Date",
    "Request Status",
    "Field",
    "Previous Value",
    "New Value",
    "Item Status",
    "SEVIS",
];

/// One spreadsheet row per change item, in the order of `rows`.
pub fn change_queue_workbook(rows: &[ChangeRow], requests: &[ChangeRequest]) -> Result<Vec<u8>, ServerError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    write_text_row(worksheet, 0, &HEADERS)?;

    let mut r = 1u32;
    for row in rows {
        let Some(req) = requests.iter().find(|q| q.id == row.request_id) else {
            continue;
        };
        for item in &req.items {
            write_text_row(
                worksheet,
                r,
                &[
                    req.id.clone(),
                    req.record_type.label().to_string(),
                    req.record_id.clone(),
                    req.requested_by.clone(),
                    req.request_date.format("%Y-%m-%d").to_string(),
                    req.status.label().to_string(),
                    item.field_path.clone(),
                    display_value(&item.previous_value),
                    display_value(&item.new_value),
                    item.status.as_str().to_string(),
                    if item.is_sevis_related { "Yes" } else { "No" }.to_string(),
                ],
            )?;
            r += 1;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {e}")))
}

pub fn export_change_queue_xlsx(rows: &[ChangeRow], requests: &[ChangeRequest]) -> ResultResp {
    let buffer = change_queue_workbook(rows, requests)?;
    xlsx_response(buffer, "change_queue.xlsx")
}
