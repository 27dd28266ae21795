//! # Repository Module
//!
//! Database repository implementations for the field sales tracker.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.sales().list(&SaleFilter::for_actor(&actor))         │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── create(&self, new_sale)                                           │
//! │  ├── get(&self, actor, id)                                             │
//! │  ├── list(&self, filter)                                               │
//! │  └── delete(&self, actor, id)                                          │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SaleRepository`](sale::SaleRepository) - Sales and their product lines
//! - [`RetailerRepository`](retailer::RetailerRepository) - Retailers, nearby search, cascade delete
//! - [`ProductRepository`](product::ProductRepository) - Product catalogue
//! - [`SalesmanRepository`](salesman::SalesmanRepository) - Salesmen, cascade delete
//! - [`FranchiseRepository`](franchise::FranchiseRepository) - Franchises and members
//! - [`AdminRepository`](admin::AdminRepository) - The single admin account
//! - [`StatisticsRepository`](statistics::StatisticsRepository) - Sale facts for rollups

pub mod admin;
pub mod franchise;
pub mod product;
pub mod retailer;
pub mod sale;
pub mod salesman;
pub mod statistics;

#[cfg(test)]
pub(crate) mod test_support {
    use fieldsales_core::{Retailer, Salesman};

    use super::retailer::NewRetailer;
    use super::salesman::NewSalesman;
    use crate::Database;

    pub async fn seed_salesman(
        db: &Database,
        email: &str,
        contact_no: &str,
        franchise_id: Option<&str>,
    ) -> Salesman {
        db.salesmen()
            .create(NewSalesman {
                first_name: "Test".into(),
                last_name: "Salesman".into(),
                name: None,
                email: email.into(),
                contact_no: contact_no.into(),
                contact_no2: None,
                password_hash: "hash".into(),
                franchise_id: franchise_id.map(str::to_string),
            })
            .await
            .unwrap()
    }

    pub async fn seed_retailer(
        db: &Database,
        salesman_id: &str,
        contact_no: &str,
        location: Option<(f64, f64)>,
    ) -> Retailer {
        db.retailers()
            .create(NewRetailer {
                retailer_name: "Test Retailer".into(),
                shop_name: "Test Shop".into(),
                contact_no: contact_no.into(),
                contact_no2: None,
                address: "Main Road".into(),
                longitude: location.map(|l| l.0),
                latitude: location.map(|l| l.1),
                added_by: salesman_id.into(),
                assigned_salesman: Some(salesman_id.into()),
            })
            .await
            .unwrap()
    }
}
