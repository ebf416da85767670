//! View-model types for the Ticket Verifier backend
//!
//! Every entity here is owned by the backend. The client only holds
//! transient copies, so unknown fields are ignored and optional fields
//! default to `None`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Order lifecycle status
///
/// Transitions are decided by the backend. `Approved`, `Verified` and
/// `Completed` all mean the payment was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Awaiting review or automatic matching
    Pending,
    /// Approved by an administrator
    Approved,
    /// Rejected by an administrator
    Rejected,
    /// Payment matched to an imported transaction
    Verified,
    /// Fulfilled
    Completed,
    /// A status this client does not know about
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether the order counts as paid
    #[must_use]
    pub const fn is_success_like(self) -> bool {
        matches!(self, Self::Approved | Self::Verified | Self::Completed)
    }

    /// Wire name, as used in `status` filters
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Verified => "Verified",
            Self::Completed => "Completed",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Numeric id
    pub id: i64,
    /// Public identifier
    #[serde(default)]
    pub uuid: String,
    /// Customer name
    pub name: String,
    /// Customer email
    pub email: String,
    /// Who referred the customer
    #[serde(default)]
    pub referral: Option<String>,
    /// Number of boys' tickets
    #[serde(default)]
    pub boys_count: u32,
    /// Number of girls' tickets
    #[serde(default)]
    pub girls_count: u32,
    /// Wave the order was priced against
    #[serde(default)]
    pub wave_id: Option<i64>,
    /// Amount the customer should have paid
    #[serde(default)]
    pub expected_amount: f64,
    /// Amount read from the receipt
    #[serde(default)]
    pub ocr_amount: Option<f64>,
    /// Date read from the receipt
    #[serde(default)]
    pub ocr_date: Option<String>,
    /// Payer name read from the receipt
    #[serde(default)]
    pub ocr_name: Option<String>,
    /// Current status
    pub status: OrderStatus,
    /// Stored receipt file name
    #[serde(default)]
    pub receipt_path: Option<String>,
    /// Creation timestamp as sent by the backend
    #[serde(default)]
    pub created_at: String,
    /// Administrator notes
    #[serde(default)]
    pub notes: Option<String>,
    /// Contact phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Name of the wave, denormalised for display
    #[serde(default)]
    pub wave_name: Option<String>,
    /// Transaction the backend matched this order to
    #[serde(default)]
    pub matched_transaction: Option<Transaction>,
}

impl Order {
    /// Total tickets on the order
    #[must_use]
    pub const fn ticket_count(&self) -> u32 {
        self.boys_count + self.girls_count
    }
}

/// Partial order update for `PUT /orders/:id`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderUpdate {
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// Administrator notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A pricing wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    /// Numeric id
    pub id: i64,
    /// Display name
    pub name: String,
    /// First day of sales
    pub start_date: NaiveDate,
    /// Last day of sales
    pub end_date: NaiveDate,
    /// Unit price of a boys' ticket, in dollars
    pub boys_price: f64,
    /// Unit price of a girls' ticket, in dollars
    pub girls_price: f64,
    /// Whether the wave is currently selling
    pub is_active: bool,
    /// Creation timestamp as sent by the backend
    #[serde(default)]
    pub created_at: String,
}

/// Body for `POST /waves`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveForm {
    /// Display name
    pub name: String,
    /// First day of sales
    pub start_date: NaiveDate,
    /// Last day of sales
    pub end_date: NaiveDate,
    /// Unit price of a boys' ticket, in dollars
    pub boys_price: f64,
    /// Unit price of a girls' ticket, in dollars
    pub girls_price: f64,
    /// Whether the wave is selling
    pub is_active: bool,
}

impl From<&Wave> for WaveForm {
    fn from(wave: &Wave) -> Self {
        Self {
            name: wave.name.clone(),
            start_date: wave.start_date,
            end_date: wave.end_date,
            boys_price: wave.boys_price,
            girls_price: wave.girls_price,
            is_active: wave.is_active,
        }
    }
}

/// Partial body for `PUT /waves/:id`; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaveUpdate {
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// First day of sales
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Last day of sales
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Unit price of a boys' ticket, in dollars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boys_price: Option<f64>,
    /// Unit price of a girls' ticket, in dollars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub girls_price: Option<f64>,
    /// Whether the wave is selling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl WaveUpdate {
    /// Update that only flips the active flag
    #[must_use]
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }
}

impl From<WaveForm> for WaveUpdate {
    fn from(form: WaveForm) -> Self {
        Self {
            name: Some(form.name),
            start_date: Some(form.start_date),
            end_date: Some(form.end_date),
            boys_price: Some(form.boys_price),
            girls_price: Some(form.girls_price),
            is_active: Some(form.is_active),
        }
    }
}

/// Imported Venmo transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Numeric id
    pub id: i64,
    /// When the payment happened
    #[serde(default)]
    pub datetime: String,
    /// Transaction type as exported by the payment app
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Payment memo
    #[serde(default)]
    pub note: String,
    /// Payer handle
    #[serde(default)]
    pub from_user: String,
    /// Payee handle
    #[serde(default)]
    pub to_user: String,
    /// Amount in dollars
    #[serde(default)]
    pub amount: f64,
    /// Processing fee in dollars
    #[serde(default)]
    pub fee: f64,
    /// Amount after fees
    #[serde(default)]
    pub net_amount: f64,
    /// Import the row came from
    #[serde(default)]
    pub csv_filename: String,
    /// When that import ran
    #[serde(default)]
    pub csv_upload_date: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: String,
}

/// Imported Zelle transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZelleTransaction {
    /// Numeric id
    pub id: i64,
    /// Posting date
    #[serde(default)]
    pub date: String,
    /// Bank description
    #[serde(default)]
    pub description: String,
    /// Amount in dollars
    #[serde(default)]
    pub amount: f64,
    /// Transaction type as exported by the bank
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Running balance
    #[serde(default)]
    pub balance: f64,
    /// Payer email or phone
    #[serde(default)]
    pub payer_identifier: String,
    /// Import the row came from
    #[serde(default)]
    pub csv_filename: String,
    /// When that import ran
    #[serde(default)]
    pub csv_upload_date: String,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: String,
}

/// Which payment app a CSV export came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    /// Venmo export
    Venmo,
    /// Zelle bank export
    Zelle,
}

/// Outcome of a CSV import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Every row imported
    Success,
    /// Import failed
    Error,
    /// Some rows imported, some rejected
    Partial,
}

/// A CSV import record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvUpload {
    /// Numeric id
    pub id: i64,
    /// Stored file name
    #[serde(default)]
    pub filename: String,
    /// File name as uploaded
    #[serde(default)]
    pub original_filename: String,
    /// Size in bytes
    #[serde(default)]
    pub file_size: u64,
    /// Source payment app
    pub upload_type: UploadType,
    /// Rows read
    #[serde(default)]
    pub records_processed: u32,
    /// Rows inserted
    #[serde(default)]
    pub new_records: u32,
    /// Rows that updated existing transactions
    #[serde(default)]
    pub updated_records: u32,
    /// Administrator who uploaded
    #[serde(default)]
    pub admin_user: String,
    /// Upload timestamp
    #[serde(default)]
    pub upload_date: String,
    /// Import outcome
    pub status: UploadStatus,
}

impl CsvUpload {
    /// Whether the import needs an administrator's attention
    #[must_use]
    pub const fn needs_attention(&self) -> bool {
        !matches!(self.status, UploadStatus::Success)
    }
}

/// Counts returned by `POST /csv/upload`
///
/// The history record ([`CsvUpload`]) is created server-side; the upload
/// response carries only the counts, and a status only when the import was
/// not clean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvImport {
    /// Stored file name
    #[serde(default)]
    pub filename: String,
    /// File name as uploaded
    #[serde(default)]
    pub original_filename: String,
    /// Source payment app
    pub upload_type: UploadType,
    /// Rows read
    #[serde(default)]
    pub records_processed: u32,
    /// Rows inserted
    #[serde(default)]
    pub new_records: u32,
    /// Rows that updated existing transactions
    #[serde(default)]
    pub updated_records: u32,
    /// Import outcome, absent for a clean import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UploadStatus>,
}

impl CsvImport {
    /// Status, treating an absent one as success
    #[must_use]
    pub fn outcome(&self) -> UploadStatus {
        self.status.unwrap_or(UploadStatus::Success)
    }
}

/// An administrator account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    /// Numeric id
    pub id: i64,
    /// Login name
    pub username: String,
    /// Account role
    #[serde(default)]
    pub role: String,
    /// Whether the account can log in
    #[serde(default)]
    pub is_active: bool,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
}

/// Aggregates computed by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analytics {
    /// All orders
    pub total_orders: u64,
    /// Orders awaiting review
    pub pending_orders: u64,
    /// Orders the backend counts as approved (includes verified)
    pub approved_orders: u64,
    /// Rejected orders
    pub rejected_orders: u64,
    /// Revenue in dollars
    pub total_revenue: f64,
    /// Order counts keyed by status
    pub orders_by_status: BTreeMap<String, u64>,
    /// Order counts keyed by wave name
    pub orders_by_wave: BTreeMap<String, u64>,
    /// Latest orders
    pub recent_orders: Vec<Order>,
    /// Imported Venmo rows
    pub venmo_transactions: u64,
    /// Imported Zelle rows
    pub zelle_transactions: u64,
}

/// Standard `{success, data?, message?, error?}` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the backend accepted the request
    pub success: bool,
    /// Payload, when the endpoint returns one
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    /// Human-readable outcome
    #[serde(default)]
    pub message: Option<String>,
    /// Error detail on failure
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Best available explanation for a rejection
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }

    /// Turn a `success: false` envelope into [`ApiError::Rejected`]
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with the backend's reason (or `fallback`)
    /// when `success` is false.
    pub fn into_result(self, fallback: &str) -> Result<Self, ApiError> {
        if self.success {
            Ok(self)
        } else {
            Err(ApiError::Rejected(
                self.reason().unwrap_or(fallback).to_string(),
            ))
        }
    }
}

/// Envelope for endpoints that return no payload
pub type Ack = ApiResponse<serde_json::Value>;

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// Items on this page
    pub data: Vec<T>,
    /// Total items across all pages
    #[serde(default)]
    pub total: u64,
    /// 1-based page number
    #[serde(default)]
    pub page: u32,
    /// Page size
    #[serde(default)]
    pub per_page: u32,
    /// Number of pages
    #[serde(default)]
    pub total_pages: u32,
}

/// Credentials for `POST /auth/login`
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    /// Login name
    pub username: String,
    /// Plain-text password
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Whether the credentials were accepted
    pub success: bool,
    /// Outcome message
    #[serde(default)]
    pub message: String,
    /// The signed-in administrator
    #[serde(default)]
    pub admin_user: Option<AdminUser>,
}

/// Result of `GET /auth/validate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Whether the request succeeded
    #[serde(default)]
    pub success: bool,
    /// Whether the session cookie belongs to a signed-in administrator
    #[serde(default)]
    pub authenticated: bool,
}

/// Body for `POST /auth/change-password`
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct PasswordChange {
    /// Current password
    pub old_password: String,
    /// Replacement password
    pub new_password: String,
}

impl std::fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordChange { .. }")
    }
}

/// Query parameters for `GET /orders`; absent fields are omitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchFilters {
    /// New status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// Restrict to one wave
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_id: Option<i64>,
    /// Earliest creation date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    /// Latest creation date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    /// Free-text search over name and email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// 1-based page number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

/// One verified order in an email export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedOrder {
    /// Email address
    pub email: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Amount in dollars
    #[serde(default)]
    pub amount: f64,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
}

/// Result of `GET /orders/verified-emails`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifiedEmails {
    /// Addresses of verified orders, newest first, one per order
    pub emails: Vec<String>,
    /// The same addresses, newline-joined
    pub email_list: String,
    /// Number of addresses
    pub count: usize,
    /// Orders behind the addresses
    pub orders: Vec<VerifiedOrder>,
}

/// An in-memory file attached to a multipart request
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name sent to the backend
    pub file_name: String,
    /// MIME type
    pub content_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Create an upload from raw parts
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Lower-cased extension of the file name, if any
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Multipart body for `POST /orders`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Boys' tickets requested
    pub boys_tickets: u32,
    /// Girls' tickets requested
    pub girls_tickets: u32,
    /// Payment receipt (image or PDF)
    pub receipt: UploadFile,
}

/// Which imported transaction ledger to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Venmo export
    Venmo,
    /// Zelle bank export
    Zelle,
}

impl TransactionKind {
    /// Path segment under `/transactions`
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::Venmo => "venmo",
            Self::Zelle => "zelle",
        }
    }
}
