//! PostgreSQL store for invoice-manager.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{info, instrument};
use uuid::Uuid;

use super::metrics::{record_query, record_store_error};
use super::store::Store;
use crate::models::{
    Client, ClientSnapshot, CompanySettings, Document, DocumentFields, DocumentKind,
    DocumentStatus, LineItem, NewClient, NewLineItem, SettingsUpdate,
};

const SETTINGS_COLUMNS: &str = "id, company_name, company_email, company_phone, company_address, \
    tax_number, pan_number, bank_name, account_number, ifsc_code, currency, logo_url, \
    tax_enabled, tax_rate, default_payment_terms, next_invoice_number, next_quotation_number, \
    next_proforma_number, custom_units, created_utc, updated_utc";

const CLIENT_COLUMNS: &str =
    "id, name, email, phone, address, tax_number, pan_number, created_utc, updated_utc";

const DOCUMENT_COLUMNS: &str = "id, document_number, document_type, status, issue_date, \
    due_date, client_name, client_email, client_address, client_tax_number, client_pan_number, \
    currency, subtotal, tax_enabled, tax_rate, tax_amount, total, payment_terms, notes, \
    created_utc, updated_utc";

const LINE_ITEM_COLUMNS: &str =
    "id, document_id, description, unit, quantity, rate, amount, sort_order, created_utc";

/// Document row as stored; kind and status are text columns.
#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    document_number: String,
    document_type: String,
    status: String,
    issue_date: NaiveDate,
    due_date: Option<NaiveDate>,
    client_name: String,
    client_email: Option<String>,
    client_address: Option<String>,
    client_tax_number: Option<String>,
    client_pan_number: Option<String>,
    currency: String,
    subtotal: Decimal,
    tax_enabled: bool,
    tax_rate: Decimal,
    tax_amount: Decimal,
    total: Decimal,
    payment_terms: Option<String>,
    notes: Option<String>,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            document_number: row.document_number,
            kind: DocumentKind::from_string(&row.document_type),
            status: DocumentStatus::from_string(&row.status),
            issue_date: row.issue_date,
            due_date: row.due_date,
            client: ClientSnapshot {
                name: row.client_name,
                email: row.client_email,
                address: row.client_address,
                tax_number: row.client_tax_number,
                pan_number: row.client_pan_number,
            },
            currency: row.currency,
            subtotal: row.subtotal,
            tax_enabled: row.tax_enabled,
            tax_rate: row.tax_rate,
            tax_amount: row.tax_amount,
            total: row.total,
            payment_terms: row.payment_terms,
            notes: row.notes,
            created_utc: row.created_utc,
            updated_utc: row.updated_utc,
        }
    }
}

#[derive(FromRow)]
struct LineItemRow {
    id: Uuid,
    document_id: Uuid,
    description: String,
    unit: String,
    quantity: Decimal,
    rate: Decimal,
    amount: Decimal,
    sort_order: i32,
    created_utc: DateTime<Utc>,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        Self {
            id: row.id,
            document_id: row.document_id,
            description: row.description,
            unit: row.unit,
            quantity: row.quantity,
            rate: row.rate,
            amount: row.amount,
            sort_order: row.sort_order,
            created_utc: row.created_utc,
        }
    }
}

fn db_error(operation: &'static str, e: sqlx::Error) -> AppError {
    record_store_error(operation);
    AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", operation.replace('_', " "), e))
}

fn counter_column(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Invoice => "next_invoice_number",
        DocumentKind::Quote => "next_quotation_number",
        DocumentKind::Proforma => "next_proforma_number",
    }
}

/// Single-statement increment so concurrent creates each advance the counter.
fn increment_counter_sql(kind: DocumentKind) -> String {
    let column = counter_column(kind);
    format!(
        "UPDATE company_settings SET {column} = {column} + 1, updated_utc = NOW() \
         WHERE id = $1 RETURNING {column}"
    )
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoice-manager"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn fetch_settings(&self) -> Result<Option<CompanySettings>, AppError> {
        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM company_settings LIMIT 1");
        sqlx::query_as::<_, CompanySettings>(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get_settings", e))
    }
}

#[async_trait]
impl Store for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Settings Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn get_or_create_settings(&self) -> Result<CompanySettings, AppError> {
        let started = Instant::now();

        if let Some(settings) = self.fetch_settings().await? {
            record_query("get_settings", started);
            return Ok(settings);
        }

        // The singleton index turns a concurrent first read into a no-op insert.
        let defaults = CompanySettings::with_defaults(Uuid::new_v4(), Utc::now());
        sqlx::query(
            r#"
            INSERT INTO company_settings (
                id, company_name, currency, tax_enabled, tax_rate, default_payment_terms,
                next_invoice_number, next_quotation_number, next_proforma_number, custom_units
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(defaults.id)
        .bind(&defaults.company_name)
        .bind(&defaults.currency)
        .bind(defaults.tax_enabled)
        .bind(defaults.tax_rate)
        .bind(&defaults.default_payment_terms)
        .bind(defaults.next_invoice_number)
        .bind(defaults.next_quotation_number)
        .bind(defaults.next_proforma_number)
        .bind(&defaults.custom_units)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("create_settings", e))?;

        info!("Default company settings created");

        let settings = self.fetch_settings().await?.ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!("Settings row missing after insert"))
        })?;
        record_query("get_settings", started);
        Ok(settings)
    }

    #[instrument(skip(self, update))]
    async fn update_settings(&self, update: &SettingsUpdate) -> Result<CompanySettings, AppError> {
        let current = self.get_or_create_settings().await?;
        let started = Instant::now();

        let sql = format!(
            r#"
            UPDATE company_settings
            SET company_name = $2, company_email = $3, company_phone = $4, company_address = $5,
                tax_number = $6, pan_number = $7, bank_name = $8, account_number = $9,
                ifsc_code = $10, currency = $11, tax_enabled = $12, tax_rate = $13,
                default_payment_terms = $14, custom_units = COALESCE($15, custom_units),
                updated_utc = NOW()
            WHERE id = $1
            RETURNING {SETTINGS_COLUMNS}
            "#
        );
        let settings = sqlx::query_as::<_, CompanySettings>(&sql)
            .bind(current.id)
            .bind(&update.company_name)
            .bind(&update.company_email)
            .bind(&update.company_phone)
            .bind(&update.company_address)
            .bind(&update.tax_number)
            .bind(&update.pan_number)
            .bind(&update.bank_name)
            .bind(&update.account_number)
            .bind(&update.ifsc_code)
            .bind(&update.currency)
            .bind(update.tax_enabled)
            .bind(update.tax_rate)
            .bind(&update.default_payment_terms)
            .bind(&update.custom_units)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("update_settings", e))?;

        record_query("update_settings", started);
        info!(settings_id = %settings.id, "Company settings updated");

        Ok(settings)
    }

    #[instrument(skip(self))]
    async fn set_logo_url(&self, logo_url: Option<&str>) -> Result<CompanySettings, AppError> {
        let current = self.get_or_create_settings().await?;
        let started = Instant::now();

        let sql = format!(
            "UPDATE company_settings SET logo_url = $2, updated_utc = NOW() \
             WHERE id = $1 RETURNING {SETTINGS_COLUMNS}"
        );
        let settings = sqlx::query_as::<_, CompanySettings>(&sql)
            .bind(current.id)
            .bind(logo_url)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("set_logo_url", e))?;

        record_query("set_logo_url", started);
        Ok(settings)
    }

    #[instrument(skip(self, units), fields(count = units.len()))]
    async fn set_custom_units(&self, units: &[String]) -> Result<CompanySettings, AppError> {
        let current = self.get_or_create_settings().await?;
        let started = Instant::now();

        let sql = format!(
            "UPDATE company_settings SET custom_units = $2, updated_utc = NOW() \
             WHERE id = $1 RETURNING {SETTINGS_COLUMNS}"
        );
        let settings = sqlx::query_as::<_, CompanySettings>(&sql)
            .bind(current.id)
            .bind(units)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("set_custom_units", e))?;

        record_query("set_custom_units", started);
        Ok(settings)
    }

    #[instrument(skip(self), fields(kind = kind.as_str()))]
    async fn increment_counter(&self, kind: DocumentKind) -> Result<u32, AppError> {
        let current = self.get_or_create_settings().await?;
        let started = Instant::now();

        let next: i32 = sqlx::query_scalar(&increment_counter_sql(kind))
            .bind(current.id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("increment_counter", e))?;

        record_query("increment_counter", started);
        info!(next, "Document counter incremented");

        Ok(next as u32)
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let started = Instant::now();
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name");
        let clients = sqlx::query_as::<_, Client>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list_clients", e))?;
        record_query("list_clients", started);
        Ok(clients)
    }

    #[instrument(skip(self), fields(client_id = %id))]
    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        let started = Instant::now();
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get_client", e))?;
        record_query("get_client", started);
        Ok(client)
    }

    #[instrument(skip(self, input))]
    async fn insert_client(&self, input: &NewClient) -> Result<Client, AppError> {
        let started = Instant::now();
        let sql = format!(
            r#"
            INSERT INTO clients (id, name, email, phone, address, tax_number, pan_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(Uuid::new_v4())
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.tax_number)
            .bind(&input.pan_number)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("insert_client", e))?;

        record_query("insert_client", started);
        info!(client_id = %client.id, "Client created");

        Ok(client)
    }

    #[instrument(skip(self), fields(client_id = %id))]
    async fn delete_client(&self, id: Uuid) -> Result<bool, AppError> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete_client", e))?;
        record_query("delete_client", started);
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Document Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn list_documents(&self) -> Result<Vec<Document>, AppError> {
        let started = Instant::now();
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_utc DESC");
        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list_documents", e))?;
        record_query("list_documents", started);
        Ok(rows.into_iter().map(Document::from).collect())
    }

    #[instrument(skip(self), fields(document_id = %id))]
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let started = Instant::now();
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get_document", e))?;
        record_query("get_document", started);
        Ok(row.map(Document::from))
    }

    #[instrument(skip(self, doc), fields(document_number = %doc.document_number, kind = doc.kind.as_str()))]
    async fn insert_document(&self, doc: &DocumentFields) -> Result<Document, AppError> {
        let started = Instant::now();
        let sql = format!(
            r#"
            INSERT INTO documents (
                id, document_number, document_type, status, issue_date, due_date,
                client_name, client_email, client_address, client_tax_number, client_pan_number,
                currency, subtotal, tax_enabled, tax_rate, tax_amount, total, payment_terms, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&doc.document_number)
            .bind(doc.kind.as_str())
            .bind(doc.status.as_str())
            .bind(doc.issue_date)
            .bind(doc.due_date)
            .bind(&doc.client.name)
            .bind(&doc.client.email)
            .bind(&doc.client.address)
            .bind(&doc.client.tax_number)
            .bind(&doc.client.pan_number)
            .bind(&doc.currency)
            .bind(doc.subtotal)
            .bind(doc.tax_enabled)
            .bind(doc.tax_rate)
            .bind(doc.tax_amount)
            .bind(doc.total)
            .bind(&doc.payment_terms)
            .bind(&doc.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("insert_document", e))?;

        record_query("insert_document", started);
        info!(document_id = %row.id, "Document created");

        Ok(Document::from(row))
    }

    #[instrument(skip(self, doc), fields(document_id = %id))]
    async fn update_document(
        &self,
        id: Uuid,
        doc: &DocumentFields,
    ) -> Result<Option<Document>, AppError> {
        let started = Instant::now();
        let sql = format!(
            r#"
            UPDATE documents
            SET document_number = $2, document_type = $3, status = $4, issue_date = $5,
                due_date = $6, client_name = $7, client_email = $8, client_address = $9,
                client_tax_number = $10, client_pan_number = $11, currency = $12,
                subtotal = $13, tax_enabled = $14, tax_rate = $15, tax_amount = $16,
                total = $17, payment_terms = $18, notes = $19, updated_utc = NOW()
            WHERE id = $1
            RETURNING {DOCUMENT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(&doc.document_number)
            .bind(doc.kind.as_str())
            .bind(doc.status.as_str())
            .bind(doc.issue_date)
            .bind(doc.due_date)
            .bind(&doc.client.name)
            .bind(&doc.client.email)
            .bind(&doc.client.address)
            .bind(&doc.client.tax_number)
            .bind(&doc.client.pan_number)
            .bind(&doc.currency)
            .bind(doc.subtotal)
            .bind(doc.tax_enabled)
            .bind(doc.tax_rate)
            .bind(doc.tax_amount)
            .bind(doc.total)
            .bind(&doc.payment_terms)
            .bind(&doc.notes)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("update_document", e))?;

        record_query("update_document", started);

        Ok(row.map(Document::from))
    }

    #[instrument(skip(self), fields(document_id = %id))]
    async fn delete_document(&self, id: Uuid) -> Result<bool, AppError> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete_document", e))?;
        record_query("delete_document", started);

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Document deleted");
        }
        Ok(deleted)
    }

    // -------------------------------------------------------------------------
    // Line Item Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(document_id = %document_id))]
    async fn get_line_items(&self, document_id: Uuid) -> Result<Vec<LineItem>, AppError> {
        let started = Instant::now();
        let sql = format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE document_id = $1 \
             ORDER BY sort_order, created_utc"
        );
        let rows = sqlx::query_as::<_, LineItemRow>(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("get_line_items", e))?;
        record_query("get_line_items", started);
        Ok(rows.into_iter().map(LineItem::from).collect())
    }

    #[instrument(skip(self, items), fields(document_id = %document_id, count = items.len()))]
    async fn replace_line_items(
        &self,
        document_id: Uuid,
        items: &[NewLineItem],
    ) -> Result<Vec<LineItem>, AppError> {
        let started = Instant::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("replace_line_items", e))?;

        sqlx::query("DELETE FROM line_items WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("replace_line_items", e))?;

        let sql = format!(
            r#"
            INSERT INTO line_items (id, document_id, description, unit, quantity, rate, amount, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LINE_ITEM_COLUMNS}
            "#
        );
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, LineItemRow>(&sql)
                .bind(Uuid::new_v4())
                .bind(document_id)
                .bind(&item.description)
                .bind(&item.unit)
                .bind(item.quantity)
                .bind(item.rate)
                .bind(item.amount)
                .bind(item.sort_order)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| db_error("replace_line_items", e))?;
            inserted.push(LineItem::from(row));
        }

        tx.commit()
            .await
            .map_err(|e| db_error("replace_line_items", e))?;

        record_query("replace_line_items", started);

        Ok(inserted)
    }

    #[instrument(skip(self), fields(document_id = %document_id))]
    async fn delete_line_items(&self, document_id: Uuid) -> Result<u64, AppError> {
        let started = Instant::now();
        let result = sqlx::query("DELETE FROM line_items WHERE document_id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete_line_items", e))?;
        record_query("delete_line_items", started);
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increment_is_a_single_relative_update() {
        let sql = increment_counter_sql(DocumentKind::Quote);
        assert!(sql.contains("SET next_quotation_number = next_quotation_number + 1"));
        assert!(sql.ends_with("RETURNING next_quotation_number"));
        assert!(!sql.contains("$2"));
    }

    #[test]
    fn each_kind_has_its_own_counter_column() {
        let columns: Vec<&str> = DocumentKind::ALL.iter().map(|k| counter_column(*k)).collect();
        assert_eq!(
            columns,
            vec!["next_invoice_number", "next_quotation_number", "next_proforma_number"]
        );
    }
}
