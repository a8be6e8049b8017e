use crate::errors::ServerError;
use crate::templates::components::error_page;
use astra::{Body, Response, ResponseBuilder};

pub fn error_status(err: &ServerError) -> u16 {
    match err {
        ServerError::NotFound => 404,
        ServerError::BadRequest(_) => 400,
        ServerError::Unauthorized(_) => 401,
        ServerError::Conflict(_) => 409,
        ServerError::Unavailable(_) => 503,
        ServerError::DbError(_)
        | ServerError::BadData(_)
        | ServerError::XlsxError(_)
        | ServerError::InternalError => 500,
    }
}

/// Convert a ServerError into an HTML error page
pub fn html_error_response(err: ServerError) -> Response {
    let status = error_status(&err);
    if status >= 500 {
        tracing::error!(status, "request failed: {err}");
    } else {
        tracing::debug!(status, "request rejected: {err}");
    }

    let message = match &err {
        ServerError::NotFound => "Not Found".to_string(),
        ServerError::BadRequest(msg) | ServerError::Unauthorized(msg) | ServerError::Conflict(msg) => msg.clone(),
        other => other.to_string(),
    };

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", mime::TEXT_HTML_UTF_8.as_ref())
        .body(Body::from(error_page(status, &message).into_string()))
        .unwrap_or_else(|_| Response::new(Body::from(message)))
}
