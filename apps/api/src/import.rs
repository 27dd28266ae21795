//! # CSV Bulk Import
//!
//! Admin upload of retailers and salesmen as CSV (multipart field `file`).
//!
//! ## Row Outcomes
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  parse ─► validate ─► duplicate? ──yes──► skipped (silent)          │
//! │     │         │            │                                         │
//! │     ▼         ▼            no                                        │
//! │   error     error          ▼                                         │
//! │                          insert ─► imported                          │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A duplicate is a contact number (or salesman email) that already exists
//! in the database or appeared earlier in the same file. Row numbers in the
//! report are 1-based data rows; the header line is not counted.

use std::collections::HashSet;

use axum::extract::Multipart;
use csv::{ReaderBuilder, Trim};
use fieldsales_core::validation::{
    normalize_email, normalize_optional, normalize_sim_number, validate_contact_number, validate_coordinates,
    validate_required,
};
use fieldsales_db::{DbError, NewRetailer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::routes::salesmen::{prepare_salesman, CreateSalesmanRequest};
use crate::SharedState;

/// Name of the multipart field carrying the CSV file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub imported: u64,
    pub skipped: u64,
    pub errors: Vec<ImportRowError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRowError {
    pub row: usize,
    pub message: String,
}

impl ImportReport {
    fn error(&mut self, row: usize, message: impl Into<String>) {
        let message = message.into();
        warn!(row, message = %message, "Import row rejected");
        self.errors.push(ImportRowError { row, message });
    }
}

enum RowOutcome {
    Imported,
    Skipped,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RetailerRow {
    retailer_name: Option<String>,
    shop_name: Option<String>,
    contact_no: Option<String>,
    contact_no2: Option<String>,
    address: Option<String>,
    longitude: Option<String>,
    latitude: Option<String>,
    assigned_salesman_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SalesmanRow {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    contact_no: Option<String>,
    contact_no2: Option<String>,
    password: Option<String>,
    franchise_sim_no: Option<String>,
}

/// Reads the `file` field of a multipart upload.
pub async fn read_file_field(mut multipart: Multipart) -> ApiResult<Vec<u8>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            let data = field.bytes().await?;
            if data.is_empty() {
                return Err(ApiError::BadRequest("Empty file provided".to_string()));
            }
            return Ok(data.to_vec());
        }
    }
    Err(ApiError::BadRequest(format!("No '{FILE_FIELD}' field found in upload")))
}

/// Parses the upload into typed rows, numbering them from 1.
fn parse_rows<T: DeserializeOwned>(data: &[u8]) -> ApiResult<Vec<(usize, Result<T, String>)>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);

    reader
        .headers()
        .map_err(|e| ApiError::BadRequest(format!("Unreadable CSV header: {e}")))?;

    Ok(reader
        .deserialize::<T>()
        .enumerate()
        .map(|(i, record)| (i + 1, record.map_err(|e| format!("Malformed row: {e}"))))
        .collect())
}

fn required(field: &str, value: Option<&str>) -> Result<String, String> {
    validate_required(field, value.unwrap_or_default()).map_err(|e| e.to_string())
}

fn parse_coordinate(field: &str, raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("{field} must be a number"))
}

// =============================================================================
// Retailers
// =============================================================================

/// Imports retailers. Each row is attributed to the salesman named by
/// `assignedSalesmanEmail`.
pub async fn import_retailers(state: &SharedState, data: &[u8]) -> ApiResult<ImportReport> {
    let rows = parse_rows::<RetailerRow>(data)?;
    let mut report = ImportReport::default();
    let mut seen = HashSet::new();

    for (row, parsed) in rows {
        let outcome = match parsed {
            Ok(record) => import_retailer_row(state, record, &mut seen).await,
            Err(message) => Err(message),
        };
        match outcome {
            Ok(RowOutcome::Imported) => report.imported += 1,
            Ok(RowOutcome::Skipped) => report.skipped += 1,
            Err(message) => report.error(row, message),
        }
    }

    info!(
        imported = report.imported,
        skipped = report.skipped,
        errors = report.errors.len(),
        "Retailer import finished"
    );
    Ok(report)
}

async fn import_retailer_row(
    state: &SharedState,
    row: RetailerRow,
    seen: &mut HashSet<String>,
) -> Result<RowOutcome, String> {
    let retailer_name = required("retailerName", row.retailer_name.as_deref())?;
    let shop_name = required("shopName", row.shop_name.as_deref())?;
    let contact_no = required("contactNo", row.contact_no.as_deref())?;
    let contact_no = validate_contact_number("contactNo", &contact_no).map_err(|e| e.to_string())?;
    let contact_no2 = normalize_optional(row.contact_no2.as_deref())
        .map(|v| validate_contact_number("contactNo2", &v))
        .transpose()
        .map_err(|e| e.to_string())?;

    let location = match (
        normalize_optional(row.longitude.as_deref()),
        normalize_optional(row.latitude.as_deref()),
    ) {
        (Some(lon), Some(lat)) => {
            let pair = [parse_coordinate("longitude", &lon)?, parse_coordinate("latitude", &lat)?];
            Some(validate_coordinates(&pair).map_err(|e| e.to_string())?)
        }
        (None, None) => None,
        _ => return Err("longitude and latitude must be given together".to_string()),
    };

    let email = required("assignedSalesmanEmail", row.assigned_salesman_email.as_deref())?;
    let email = normalize_email(&email).map_err(|e| e.to_string())?;

    if seen.contains(&contact_no) {
        debug!(contact_no = %contact_no, "Skipping contact repeated in file");
        return Ok(RowOutcome::Skipped);
    }
    if state.db.retailers().contact_exists(&contact_no).await.map_err(|e| e.to_string())? {
        debug!(contact_no = %contact_no, "Skipping existing retailer contact");
        seen.insert(contact_no);
        return Ok(RowOutcome::Skipped);
    }

    let salesman = state
        .db
        .salesmen()
        .find_by_email(&email)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("No salesman with email {email}"))?;

    let new = NewRetailer {
        retailer_name,
        shop_name,
        contact_no: contact_no.clone(),
        contact_no2,
        address: row.address.unwrap_or_default(),
        longitude: location.map(|p| p.longitude),
        latitude: location.map(|p| p.latitude),
        added_by: salesman.id.clone(),
        assigned_salesman: Some(salesman.id),
    };

    // Keys are only claimed by rows that made it in, so a failed row does not
    // shadow a corrected copy further down the file.
    let outcome = match state.db.retailers().create(new).await {
        Ok(_) => RowOutcome::Imported,
        Err(DbError::UniqueViolation { .. }) => RowOutcome::Skipped,
        Err(e) => return Err(e.to_string()),
    };
    seen.insert(contact_no);
    Ok(outcome)
}

// =============================================================================
// Salesmen
// =============================================================================

/// Imports salesmen. `franchiseSimNo`, when given, must match a franchise.
pub async fn import_salesmen(state: &SharedState, data: &[u8]) -> ApiResult<ImportReport> {
    let rows = parse_rows::<SalesmanRow>(data)?;
    let mut report = ImportReport::default();
    let mut seen_emails = HashSet::new();
    let mut seen_contacts = HashSet::new();

    for (row, parsed) in rows {
        let outcome = match parsed {
            Ok(record) => import_salesman_row(state, record, &mut seen_emails, &mut seen_contacts).await,
            Err(message) => Err(message),
        };
        match outcome {
            Ok(RowOutcome::Imported) => report.imported += 1,
            Ok(RowOutcome::Skipped) => report.skipped += 1,
            Err(message) => report.error(row, message),
        }
    }

    info!(
        imported = report.imported,
        skipped = report.skipped,
        errors = report.errors.len(),
        "Salesman import finished"
    );
    Ok(report)
}

async fn import_salesman_row(
    state: &SharedState,
    row: SalesmanRow,
    seen_emails: &mut HashSet<String>,
    seen_contacts: &mut HashSet<String>,
) -> Result<RowOutcome, String> {
    let first_name = required("firstName", row.first_name.as_deref())?;
    let last_name = required("lastName", row.last_name.as_deref())?;
    let email = required("email", row.email.as_deref())?;
    let email = normalize_email(&email).map_err(|e| e.to_string())?;
    let contact_no = required("contactNo", row.contact_no.as_deref())?;
    let contact_no = validate_contact_number("contactNo", &contact_no).map_err(|e| e.to_string())?;
    let password = required("password", row.password.as_deref())?;

    let franchise_id = match normalize_optional(row.franchise_sim_no.as_deref()) {
        Some(raw) => {
            let sim = normalize_sim_number(&raw).map_err(|e| e.to_string())?;
            let franchise = state
                .db
                .franchises()
                .find_by_sim(&sim)
                .await
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("No franchise with SIM number {sim}"))?;
            Some(franchise.id)
        }
        None => None,
    };

    if seen_emails.contains(&email) || seen_contacts.contains(&contact_no) {
        debug!(email = %email, "Skipping salesman repeated in file");
        return Ok(RowOutcome::Skipped);
    }

    let salesmen = state.db.salesmen();
    let exists = salesmen.email_exists(&email).await.map_err(|e| e.to_string())?
        || salesmen.contact_exists(&contact_no).await.map_err(|e| e.to_string())?;
    if exists {
        debug!(email = %email, "Skipping existing salesman");
        seen_emails.insert(email);
        seen_contacts.insert(contact_no);
        return Ok(RowOutcome::Skipped);
    }

    let request = CreateSalesmanRequest {
        first_name,
        last_name,
        name: None,
        email: email.clone(),
        contact_no: contact_no.clone(),
        contact_no2: row.contact_no2,
        password,
        franchise_id,
    };
    let new = prepare_salesman(state, request).await.map_err(|e| e.to_string())?;

    let outcome = match salesmen.create(new).await {
        Ok(_) => RowOutcome::Imported,
        Err(DbError::UniqueViolation { .. }) => RowOutcome::Skipped,
        Err(e) => return Err(e.to_string()),
    };
    seen_emails.insert(email);
    seen_contacts.insert(contact_no);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_numbers_data_rows_from_one() {
        let csv = "retailerName,shopName,contactNo\nA,Shop A,03001234567\nB,Shop B,03007654321\n";
        let rows = parse_rows::<RetailerRow>(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, 1);
        assert_eq!(rows[1].0, 2);
        let first = rows[0].1.as_ref().unwrap();
        assert_eq!(first.retailer_name.as_deref(), Some("A"));
        assert!(first.longitude.is_none());
    }

    #[test]
    fn test_parse_rows_trims_and_treats_empty_as_missing() {
        let csv = "firstName,lastName,email,contactNo,contactNo2,password,franchiseSimNo\n  Ali , Khan ,ali@example.com,03001234567,,secret1,\n";
        let rows = parse_rows::<SalesmanRow>(csv.as_bytes()).unwrap();

        let row = rows[0].1.as_ref().unwrap();
        assert_eq!(row.first_name.as_deref(), Some("Ali"));
        assert_eq!(row.last_name.as_deref(), Some("Khan"));
        assert!(row.contact_no2.is_none());
        assert!(row.franchise_sim_no.is_none());
    }

    #[test]
    fn test_required_reports_field_name() {
        let err = required("shopName", None).unwrap_err();
        assert!(err.contains("shopName"));
        assert!(required("shopName", Some("  ")).is_err());
        assert_eq!(required("shopName", Some("Corner")).unwrap(), "Corner");
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("latitude", "31.5").unwrap(), 31.5);
        assert!(parse_coordinate("latitude", "north").unwrap_err().contains("latitude"));
    }

    #[test]
    fn test_report_serializes_errors() {
        let mut report = ImportReport::default();
        report.imported = 2;
        report.error(3, "contactNo is required");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["imported"], 2);
        assert_eq!(json["skipped"], 0);
        assert_eq!(json["errors"][0]["row"], 3);
        assert_eq!(json["errors"][0]["message"], "contactNo is required");
    }
}
