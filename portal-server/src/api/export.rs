//! CSV downloads, scoped like the matching list endpoints

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{
    Router,
    extract::{Path, State},
};
use shared::csv::{CsvWriter, opt, timestamp};
use shared::error::{AppError, ErrorCode};
use shared::models::{Client, InboundPackage, Invoice, ShippingBox};

use crate::auth::CurrentUser;
use crate::db;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/export/{file}", get(export_csv))
}

pub fn clients_csv(clients: &[Client]) -> String {
    let mut csv = CsvWriter::new(&[
        "code",
        "name",
        "email",
        "phone",
        "country",
        "state",
        "city",
        "address",
        "postal_code",
        "document_type",
        "document_number",
        "activo",
        "created_at",
    ]);
    for c in clients {
        csv.row([
            c.code.to_string(),
            c.name.clone(),
            opt(&c.email),
            opt(&c.phone),
            c.country.clone(),
            opt(&c.state),
            opt(&c.city),
            opt(&c.address),
            opt(&c.postal_code),
            opt(&c.document_type),
            opt(&c.document_number),
            c.activo.to_string(),
            timestamp(c.created_at),
        ]);
    }
    csv.finish()
}

pub fn packages_csv(packages: &[InboundPackage]) -> String {
    let mut csv = CsvWriter::new(&[
        "tracking",
        "carrier",
        "client_id",
        "weight_lb",
        "status",
        "box_id",
        "notes",
        "received_at",
    ]);
    for p in packages {
        csv.row([
            p.tracking.clone(),
            opt(&p.carrier),
            p.client_id.to_string(),
            p.weight_lb.to_string(),
            p.status.as_str().to_string(),
            opt(&p.box_id),
            opt(&p.notes),
            timestamp(p.received_at),
        ]);
    }
    csv.finish()
}

pub fn boxes_csv(boxes: &[ShippingBox]) -> String {
    let mut csv = CsvWriter::new(&[
        "code",
        "client_id",
        "country",
        "type",
        "status",
        "items",
        "weight_lb",
        "shipment_id",
        "created_at",
    ]);
    for b in boxes {
        csv.row([
            b.code.to_string(),
            b.client_id.to_string(),
            b.country.clone(),
            b.box_type.as_str().to_string(),
            b.status.as_str().to_string(),
            b.item_ids.len().to_string(),
            b.weight_lb.to_string(),
            opt(&b.shipment_id),
            timestamp(b.created_at),
        ]);
    }
    csv.finish()
}

pub fn invoices_csv(invoices: &[Invoice]) -> String {
    let mut csv = CsvWriter::new(&[
        "number",
        "client_id",
        "shipment_id",
        "status",
        "total_usd",
        "paid_at",
        "created_at",
    ]);
    for i in invoices {
        csv.row([
            i.number.to_string(),
            i.client_id.to_string(),
            opt(&i.shipment_id),
            i.status.as_str().to_string(),
            i.total_usd.to_string(),
            i.paid_at.map(timestamp).unwrap_or_default(),
            timestamp(i.created_at),
        ]);
    }
    csv.finish()
}

fn csv_response(name: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}.csv\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /api/export/{clients|packages|boxes|invoices}.csv
pub async fn export_csv(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let pool = &state.pool;
    let scope = current.scope;
    let limit = db::EXPORT_LIMIT;

    let name = file.strip_suffix(".csv").unwrap_or(&file);
    let body = match name {
        "clients" => {
            let filter = db::clients::ClientFilter { limit, ..Default::default() };
            clients_csv(&db::clients::list(pool, scope, &filter).await?)
        }
        "packages" => {
            let filter = db::packages::PackageFilter { limit, ..Default::default() };
            packages_csv(&db::packages::list(pool, scope, &filter).await?)
        }
        "boxes" => {
            let filter = db::boxes::BoxFilter { limit, ..Default::default() };
            boxes_csv(&db::boxes::list(pool, scope, &filter).await?)
        }
        "invoices" => {
            let filter = db::invoices::InvoiceFilter { limit, ..Default::default() };
            invoices_csv(&db::invoices::list(pool, scope, &filter).await?)
        }
        _ => {
            return Err(AppError::with_message(
                ErrorCode::NotFound,
                format!("Unknown export: {file}"),
            ));
        }
    };

    tracing::info!(user_id = current.id, export = name, "CSV export");
    Ok(csv_response(name, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::models::{InvoiceStatus, PackageStatus};

    #[test]
    fn test_packages_csv_quotes_notes() {
        let p = InboundPackage {
            id: 1,
            tracking: "1Z999".into(),
            carrier: Some("UPS".into()),
            client_id: 5,
            weight_lb: dec!(2.5),
            photo_url: None,
            status: PackageStatus::Received,
            box_id: None,
            notes: Some("frágil, \"cuidado\"".into()),
            received_at: 0,
            updated_at: 0,
        };
        let csv = packages_csv(&[p]);
        assert!(csv.starts_with('\u{FEFF}'));
        let lines: Vec<&str> = csv.trim_start_matches('\u{FEFF}').split("\r\n").collect();
        assert_eq!(lines[0], "tracking,carrier,client_id,weight_lb,status,box_id,notes,received_at");
        assert_eq!(
            lines[1],
            "1Z999,UPS,5,2.5,received,,\"frágil, \"\"cuidado\"\"\",1970-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_invoices_csv_unpaid_has_empty_paid_at() {
        let inv = Invoice {
            id: 1,
            number: 12,
            client_id: 5,
            shipment_id: None,
            items: vec![],
            total_usd: dec!(10.00),
            status: InvoiceStatus::Open,
            notes: None,
            stripe_session_id: None,
            checkout_url: None,
            checkout_expires_at: None,
            paid_at: None,
            created_at: 0,
            updated_at: 0,
        };
        let csv = invoices_csv(&[inv]);
        assert!(csv.contains("\r\n12,5,,open,10.00,,1970-01-01T00:00:00Z\r\n"));
    }

    #[test]
    fn test_csv_response_headers() {
        let resp = csv_response("boxes", String::new());
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"boxes.csv\""
        );
    }
}
