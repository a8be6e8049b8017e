use crate::commands::{Command, CommandHandler};
use crate::config::Config;
use crate::db::StoreClients;
use crate::domain::coordinator::CoordinatorFilter;
use crate::domain::queue::{build_queue_view, QueueMetrics, QueueQuery};
use crate::errors::ServerError;
use crate::loaders::{self, CoordinatorCounts};
use crate::responses::{html_response, redirect, ResultResp};
use crate::sevis_gateway::SevisGateway;
use crate::spreadsheets::{export_batch_xlsx, export_change_queue_xlsx};
use crate::templates::pages;
use astra::Request;
use chrono::Utc;
use std::collections::HashMap;
use std::io::Read;
use url::form_urlencoded;

/// Everything a request handler may touch, built once in `main`.
pub struct AppContext {
    pub clients: StoreClients,
    pub gateway: Option<Box<dyn SevisGateway>>,
    pub config: Config,
}

impl AppContext {
    fn commands(&self) -> CommandHandler<'_> {
        CommandHandler::new(&self.clients, self.gateway.as_deref())
    }

    fn can_write(&self) -> bool {
        self.clients.admin.is_some()
    }
}

pub fn handle(mut req: Request, ctx: &AppContext) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().trim_end_matches('/').to_string();
    let query = parse_query(&req);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    tracing::debug!(%method, %path, "request");

    match (method.as_str(), segments.as_slice()) {
        ("GET", []) => redirect("/sevis-user"),
        ("GET", ["sevis-user"]) => {
            html_response(pages::dashboard_page(
                &loaders::load_dashboard(&ctx.clients),
                ctx.config.app_id.as_deref(),
            ))
        }

        ("POST", ["sevis-user", "relationships"]) => {
            let form = Form::read(&mut req)?;
            ctx.commands().execute(
                Command::LinkProfiles {
                    from_id: form.get("from_id").unwrap_or_default().trim().to_string(),
                    to_id: form.get("to_id").unwrap_or_default().trim().to_string(),
                    kind: form.get("kind").unwrap_or_default().to_string(),
                    payload: None,
                },
                Utc::now(),
            )?;
            redirect("/sevis-user")
        }

        // Change queue
        ("GET", ["sevis-user", "change-queue"]) => {
            let loaded = loaders::load_change_queue(&ctx.clients);
            let view = build_queue_view(&loaded.data, &QueueQuery::from_params(&query));
            html_response(pages::change_queue_page(
                &view,
                &loaded.data,
                loaded.fallback.as_deref(),
                ctx.can_write(),
            ))
        }
        ("GET", ["sevis-user", "change-queue", "export"]) => {
            let loaded = loaders::load_change_queue(&ctx.clients);
            let view = build_queue_view(&loaded.data, &QueueQuery::from_params(&query));
            export_change_queue_xlsx(&view.rows, &loaded.data)
        }
        ("POST", ["sevis-user", "change-queue", "items", item_id, "comments"]) => {
            let form = Form::read(&mut req)?;
            ctx.commands().execute(
                Command::AddComment {
                    item_id: item_id.to_string(),
                    author: form.get("author").unwrap_or_default().to_string(),
                    body: form.get("body").unwrap_or_default().to_string(),
                    is_internal: form.flag("internal"),
                },
                Utc::now(),
            )?;
            redirect("/sevis-user/change-queue")
        }
        ("POST", ["sevis-user", "change-queue", request_id, action]) => {
            let form = Form::read(&mut req)?;
            let request_id = request_id.to_string();
            let approver = form.get("approver").unwrap_or_default().to_string();
            let items = form.all("items");

            let cmd = match *action {
                "approve" => Command::ApproveItems {
                    request_id,
                    item_ids: items,
                    approver,
                },
                "reject" if items.is_empty() => Command::RejectRequest {
                    request_id,
                    approver,
                    reason: form.get("reason").unwrap_or_default().to_string(),
                },
                "reject" => Command::RejectItems {
                    request_id,
                    item_ids: items,
                    approver,
                    reason: form.get("reason").unwrap_or_default().to_string(),
                },
                "cancel" => Command::CancelRequest { request_id },
                _ => return Err(ServerError::NotFound),
            };
            ctx.commands().execute(cmd, Utc::now())?;
            redirect("/sevis-user/change-queue")
        }

        // Local coordinators
        ("GET", ["sevis-user", "local-coordinators"]) => {
            let loaded = loaders::load_coordinators(&ctx.clients);
            let filter = CoordinatorFilter::parse(query.get("filter").map(String::as_str));
            let vm = pages::CoordinatorsVm {
                rows: loaded.data.iter().filter(|r| filter.matches(r)).collect(),
                counts: CoordinatorCounts::collect(&loaded.data),
                filter,
                fallback: loaded.fallback.as_deref(),
                can_write: ctx.can_write(),
            };
            html_response(pages::coordinators_page(&vm))
        }
        ("POST", ["sevis-user", "local-coordinators", user_id, "region"]) => {
            let form = Form::read(&mut req)?;
            ctx.commands().execute(
                Command::AssignRegion {
                    user_id: user_id.to_string(),
                    region: form.get("region").unwrap_or_default().to_string(),
                },
                Utc::now(),
            )?;
            redirect("/sevis-user/local-coordinators")
        }

        // Student application
        ("GET", ["sevis-user", "student-application", student_id]) => {
            let loaded = loaders::load_student_application(&ctx.clients, student_id)?;
            html_response(pages::student_application_page(&loaded))
        }

        // SEVIS batches
        ("GET", ["sevis-user", "sevis-batches"]) => {
            let batches = loaders::load_batches(&ctx.clients);
            let queue = loaders::load_change_queue(&ctx.clients);
            // fallback requests can't be batched, so don't advertise them
            let ready = if queue.is_fallback() {
                0
            } else {
                QueueMetrics::collect(&queue.data).sevis_ready
            };
            html_response(pages::sevis_batches_page(
                &batches.data,
                ready,
                batches.fallback.as_deref(),
                ctx.can_write(),
            ))
        }
        ("POST", ["sevis-user", "sevis-batches"]) => {
            let form = Form::read(&mut req)?;
            ctx.commands().execute(
                Command::CreateSevisBatch {
                    name: form.get("name").unwrap_or_default().to_string(),
                },
                Utc::now(),
            )?;
            redirect("/sevis-user/sevis-batches")
        }
        ("POST", ["sevis-user", "sevis-batches", batch_id, "submit"]) => {
            ctx.commands().execute(
                Command::SubmitSevisBatch {
                    batch_id: batch_id.to_string(),
                },
                Utc::now(),
            )?;
            redirect("/sevis-user/sevis-batches")
        }
        ("GET", ["sevis-user", "sevis-batches", batch_id, "export"]) => {
            let batches = loaders::load_batches(&ctx.clients);
            let summary = batches
                .data
                .iter()
                .find(|s| s.batch.id == *batch_id)
                .ok_or(ServerError::NotFound)?;
            export_batch_xlsx(summary)
        }

        _ => Err(ServerError::NotFound),
    }
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Decoded `application/x-www-form-urlencoded` body. Keeps every pair so
/// repeated keys (checkbox lists) survive.
struct Form {
    pairs: Vec<(String, String)>,
}

impl Form {
    fn read(req: &mut Request) -> Result<Self, ServerError> {
        let mut raw = Vec::new();
        req.body_mut()
            .reader()
            .read_to_end(&mut raw)
            .map_err(|e| ServerError::BadRequest(format!("unreadable form body: {e}")))?;
        Ok(Self {
            pairs: form_urlencoded::parse(&raw).into_owned().collect(),
        })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("1" | "on" | "true"))
    }
}
