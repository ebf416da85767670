//! In-memory backend for console tests
//!
//! [`MockApi`] implements `TicketApi` against an in-memory model of the
//! backend: waves, orders, CSV imports, and a single admin account. Every
//! call is recorded as an [`ApiCall`], and failures can be injected per call
//! so tests can exercise partial-failure paths.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use ticket_verifier_api::{
    Ack, Analytics, ApiError, ApiResponse, CsvImport, CsvUpload, LoginRequest, LoginResponse, NewOrder,
    Order, OrderStatus, OrderUpdate, PaginatedResponse, PasswordChange, SearchFilters,
    SessionEvent, SessionEvents, SessionStatus, TicketApi, Transaction, TransactionKind,
    UploadFile, UploadStatus, UploadType, VerifiedEmails, VerifiedOrder, Wave, WaveForm,
    WaveUpdate, ZelleTransaction,
};

/// A recorded call to the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    /// `POST /auth/login`
    Login {
        /// Username sent
        username: String,
    },
    /// `POST /auth/logout`
    Logout,
    /// `GET /auth/validate`
    ValidateSession,
    /// `POST /auth/change-password`
    ChangePassword,
    /// `GET /orders`
    Orders(SearchFilters),
    /// `GET /orders/:id`
    Order(i64),
    /// `POST /orders`
    CreateOrder {
        /// Customer email sent
        email: String,
        /// Receipt file name sent
        receipt: String,
    },
    /// `PUT /orders/:id`
    UpdateOrder(i64),
    /// `DELETE /orders/:id`
    DeleteOrder(i64),
    /// `POST /orders/:id/approve`
    ApproveOrder(i64),
    /// `POST /orders/:id/reject`
    RejectOrder(i64),
    /// `GET /orders/verified-emails`
    VerifiedEmails,
    /// `GET /orders/export`
    ExportOrders,
    /// `POST /orders/rerun-matching`
    RerunMatching,
    /// `GET /waves`
    Waves,
    /// `GET /waves/current`
    CurrentWave,
    /// `POST /waves`
    CreateWave(String),
    /// `PUT /waves/:id`
    UpdateWave(i64, WaveUpdate),
    /// `DELETE /waves/:id`
    DeleteWave(i64),
    /// `GET /transactions/{kind}`
    Transactions(TransactionKind),
    /// `GET /transactions/{kind}/export`
    ExportTransactions(TransactionKind),
    /// `POST /csv/upload`
    UploadCsv(String),
    /// `GET /csv/uploads`
    CsvUploads,
    /// `GET /analytics`
    Analytics,
}

impl ApiCall {
    /// Whether this call changes backend state
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Login { .. }
                | Self::Logout
                | Self::ChangePassword
                | Self::CreateOrder { .. }
                | Self::UpdateOrder(_)
                | Self::DeleteOrder(_)
                | Self::ApproveOrder(_)
                | Self::RejectOrder(_)
                | Self::RerunMatching
                | Self::CreateWave(_)
                | Self::UpdateWave(..)
                | Self::DeleteWave(_)
                | Self::UploadCsv(_)
        )
    }
}

type Matcher = Box<dyn Fn(&ApiCall) -> bool + Send + Sync>;

struct Failure {
    matcher: Matcher,
    error: ApiError,
    persistent: bool,
}

#[derive(Debug, Clone)]
struct Backend {
    username: String,
    password: String,
    authenticated: bool,
    waves: Vec<Wave>,
    orders: Vec<Order>,
    uploads: Vec<CsvUpload>,
    venmo: Vec<Transaction>,
    zelle: Vec<ZelleTransaction>,
    next_upload_status: UploadStatus,
    next_id: i64,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            authenticated: false,
            waves: Vec::new(),
            orders: Vec::new(),
            uploads: Vec::new(),
            venmo: Vec::new(),
            zelle: Vec::new(),
            next_upload_status: UploadStatus::Success,
            next_id: 100,
        }
    }
}

impl Backend {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn active_wave(&self) -> Option<&Wave> {
        self.waves.iter().find(|w| w.is_active)
    }

    fn order_mut(&mut self, id: i64) -> Result<&mut Order, ApiError> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| not_found("Order"))
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Api {
        status: 404,
        message: format!("{what} not found"),
    }
}

fn ack(message: &str) -> Ack {
    ApiResponse {
        success: true,
        data: None,
        message: Some(message.to_string()),
        error: None,
    }
}

fn with_data<T>(data: T, message: &str) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data: Some(data),
        message: Some(message.to_string()),
        error: None,
    }
}

/// In-memory fake of the Ticket Verifier backend
///
/// Clones share the same backend, call log, and failure plan.
///
/// # Example
///
/// ```
/// use ticket_verifier_testing::{ApiCall, MockApi, fixtures};
/// use ticket_verifier_api::{ApiError, TicketApi};
///
/// # tokio_test::block_on(async {
/// let api = MockApi::new().with_waves(vec![fixtures::wave(1, true)]);
/// api.fail_next(|call| matches!(call, ApiCall::Waves), ApiError::Timeout);
///
/// assert_eq!(api.waves().await, Err(ApiError::Timeout));
/// assert_eq!(api.waves().await.unwrap().len(), 1);
/// assert_eq!(api.count(|c| matches!(c, ApiCall::Waves)), 2);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MockApi {
    backend: Arc<RwLock<Backend>>,
    calls: Arc<Mutex<Vec<ApiCall>>>,
    failures: Arc<Mutex<Vec<Failure>>>,
    session: Option<SessionEvents>,
}

impl std::fmt::Debug for MockApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockApi")
            .field("calls", &self.calls.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}

impl MockApi {
    /// Create an empty backend with the account `admin` / `admin123`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `Unauthorized` on `session` whenever a call fails with `401`,
    /// as the real client's interceptor does
    #[must_use]
    pub fn with_session(mut self, session: SessionEvents) -> Self {
        self.session = Some(session);
        self
    }

    /// Seed waves
    #[must_use]
    pub fn with_waves(self, waves: Vec<Wave>) -> Self {
        self.backend.write().unwrap().waves = waves;
        self
    }

    /// Seed orders
    #[must_use]
    pub fn with_orders(self, orders: Vec<Order>) -> Self {
        self.backend.write().unwrap().orders = orders;
        self
    }

    /// Seed CSV import history
    #[must_use]
    pub fn with_uploads(self, uploads: Vec<CsvUpload>) -> Self {
        self.backend.write().unwrap().uploads = uploads;
        self
    }

    /// Start with a valid session cookie
    #[must_use]
    pub fn authenticated(self) -> Self {
        self.backend.write().unwrap().authenticated = true;
        self
    }

    /// Status the next CSV import will report
    pub fn set_next_upload_status(&self, status: UploadStatus) {
        self.backend.write().unwrap().next_upload_status = status;
    }

    /// Fail the next call matching `matcher` with `error`
    pub fn fail_next<F>(&self, matcher: F, error: ApiError)
    where
        F: Fn(&ApiCall) -> bool + Send + Sync + 'static,
    {
        self.failures.lock().unwrap().push(Failure {
            matcher: Box::new(matcher),
            error,
            persistent: false,
        });
    }

    /// Fail every call matching `matcher` with `error`
    pub fn fail_always<F>(&self, matcher: F, error: ApiError)
    where
        F: Fn(&ApiCall) -> bool + Send + Sync + 'static,
    {
        self.failures.lock().unwrap().push(Failure {
            matcher: Box::new(matcher),
            error,
            persistent: true,
        });
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls matching `predicate`
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    /// Mutating calls made so far, in order
    #[must_use]
    pub fn mutations(&self) -> Vec<ApiCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget recorded calls (for test isolation)
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Current copy of a wave
    #[must_use]
    pub fn wave(&self, id: i64) -> Option<Wave> {
        self.backend
            .read()
            .unwrap()
            .waves
            .iter()
            .find(|w| w.id == id)
            .cloned()
    }

    /// Current copy of all waves
    #[must_use]
    pub fn all_waves(&self) -> Vec<Wave> {
        self.backend.read().unwrap().waves.clone()
    }

    /// Current copy of all orders
    #[must_use]
    pub fn all_orders(&self) -> Vec<Order> {
        self.backend.read().unwrap().orders.clone()
    }

    /// Whether the fake session cookie is valid
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.backend.read().unwrap().authenticated
    }

    /// Record the call and apply any injected failure
    fn begin(&self, call: ApiCall) -> Result<(), ApiError> {
        let injected = {
            let mut failures = self.failures.lock().unwrap();
            let position = failures.iter().position(|f| (f.matcher)(&call));
            position.map(|index| {
                if failures[index].persistent {
                    failures[index].error.clone()
                } else {
                    failures.remove(index).error
                }
            })
        };
        self.calls.lock().unwrap().push(call);

        match injected {
            Some(ApiError::Unauthorized) => {
                if let Some(session) = &self.session {
                    session.publish(SessionEvent::Unauthorized);
                }
                Err(ApiError::Unauthorized)
            }
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn require_session(&self) -> Result<(), ApiError> {
        if self.backend.read().unwrap().authenticated {
            Ok(())
        } else {
            if let Some(session) = &self.session {
                session.publish(SessionEvent::Unauthorized);
            }
            Err(ApiError::Unauthorized)
        }
    }
}

fn expected_amount(wave: &Wave, boys: u32, girls: u32) -> f64 {
    f64::from(boys) * wave.boys_price + f64::from(girls) * wave.girls_price
}

fn matches_filters(order: &Order, filters: &SearchFilters) -> bool {
    let status_ok = filters.status.is_none_or(|s| order.status == s);
    let wave_ok = filters.wave_id.is_none_or(|w| order.wave_id == Some(w));
    let search_ok = filters.search.as_deref().is_none_or(|needle| {
        let needle = needle.to_lowercase();
        order.name.to_lowercase().contains(&needle) || order.email.to_lowercase().contains(&needle)
    });
    status_ok && wave_ok && search_ok
}

#[async_trait]
impl TicketApi for MockApi {
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        self.begin(ApiCall::Login {
            username: request.username.clone(),
        })?;
        let mut backend = self.backend.write().unwrap();
        if request.username == backend.username && request.password == backend.password {
            backend.authenticated = true;
            Ok(LoginResponse {
                success: true,
                message: "Login successful".to_string(),
                admin_user: None,
            })
        } else {
            Ok(LoginResponse {
                success: false,
                message: "Invalid username or password".to_string(),
                admin_user: None,
            })
        }
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.begin(ApiCall::Logout)?;
        self.backend.write().unwrap().authenticated = false;
        Ok(())
    }

    async fn validate_session(&self) -> Result<SessionStatus, ApiError> {
        self.begin(ApiCall::ValidateSession)?;
        Ok(SessionStatus {
            success: true,
            authenticated: self.backend.read().unwrap().authenticated,
        })
    }

    async fn change_password(&self, change: PasswordChange) -> Result<Ack, ApiError> {
        self.begin(ApiCall::ChangePassword)?;
        self.require_session()?;
        let mut backend = self.backend.write().unwrap();
        if change.old_password != backend.password {
            return Err(ApiError::Rejected("Current password is incorrect".to_string()));
        }
        backend.password = change.new_password;
        Ok(ack("Password changed successfully"))
    }

    async fn orders(&self, filters: SearchFilters) -> Result<PaginatedResponse<Order>, ApiError> {
        self.begin(ApiCall::Orders(filters.clone()))?;
        self.require_session()?;
        let backend = self.backend.read().unwrap();
        let matching: Vec<Order> = backend
            .orders
            .iter()
            .filter(|o| matches_filters(o, &filters))
            .cloned()
            .collect();

        let per_page = filters.per_page.unwrap_or(20).max(1);
        let page = filters.page.unwrap_or(1).max(1);
        let total = matching.len();
        let skip = usize::try_from((page - 1) * per_page).unwrap_or(usize::MAX);
        let data = matching
            .into_iter()
            .skip(skip)
            .take(per_page as usize)
            .collect();

        Ok(PaginatedResponse {
            data,
            total: total as u64,
            page,
            per_page,
            total_pages: u32::try_from(total.div_ceil(per_page as usize)).unwrap_or(u32::MAX),
        })
    }

    async fn order(&self, id: i64) -> Result<Order, ApiError> {
        self.begin(ApiCall::Order(id))?;
        self.require_session()?;
        let mut backend = self.backend.write().unwrap();
        backend.order_mut(id).map(|o| o.clone())
    }

    async fn create_order(&self, order: NewOrder) -> Result<ApiResponse<Order>, ApiError> {
        self.begin(ApiCall::CreateOrder {
            email: order.email.clone(),
            receipt: order.receipt.file_name.clone(),
        })?;
        let mut backend = self.backend.write().unwrap();
        let Some(wave) = backend.active_wave().cloned() else {
            return Err(ApiError::Rejected("No active wave available".to_string()));
        };
        let id = backend.allocate_id();
        let created = Order {
            id,
            uuid: format!("order-{id}"),
            name: order.name,
            email: order.email,
            referral: None,
            boys_count: order.boys_tickets,
            girls_count: order.girls_tickets,
            wave_id: Some(wave.id),
            expected_amount: expected_amount(&wave, order.boys_tickets, order.girls_tickets),
            ocr_amount: None,
            ocr_date: None,
            ocr_name: None,
            status: OrderStatus::Pending,
            receipt_path: Some(format!("{id}_{}", order.receipt.file_name)),
            created_at: "2025-01-01T12:00:00".to_string(),
            notes: None,
            phone: None,
            wave_name: Some(wave.name),
            matched_transaction: None,
        };
        backend.orders.push(created.clone());
        Ok(with_data(created, "Order submitted successfully"))
    }

    async fn update_order(
        &self,
        id: i64,
        update: OrderUpdate,
    ) -> Result<ApiResponse<Order>, ApiError> {
        self.begin(ApiCall::UpdateOrder(id))?;
        self.require_session()?;
        let mut backend = self.backend.write().unwrap();
        let order = backend.order_mut(id)?;
        if let Some(name) = update.name {
            order.name = name;
        }
        if let Some(email) = update.email {
            order.email = email;
        }
        if let Some(status) = update.status {
            order.status = status;
        }
        if let Some(notes) = update.notes {
            order.notes = Some(notes);
        }
        Ok(with_data(order.clone(), "Order updated"))
    }

    async fn delete_order(&self, id: i64) -> Result<Ack, ApiError> {
        self.begin(ApiCall::DeleteOrder(id))?;
        self.require_session()?;
        let mut backend = self.backend.write().unwrap();
        let before = backend.orders.len();
        backend.orders.retain(|o| o.id != id);
        if backend.orders.len() == before {
            return Err(not_found("Order"));
        }
        Ok(ack("Order deleted"))
    }

    async fn approve_order(&self, id: i64) -> Result<Ack, ApiError> {
        self.begin(ApiCall::ApproveOrder(id))?;
        self.require_session()?;
        self.backend.write().unwrap().order_mut(id)?.status = OrderStatus::Approved;
        Ok(ack("Order approved"))
    }

    async fn reject_order(&self, id: i64) -> Result<Ack, ApiError> {
        self.begin(ApiCall::RejectOrder(id))?;
        self.require_session()?;
        self.backend.write().unwrap().order_mut(id)?.status = OrderStatus::Rejected;
        Ok(ack("Order rejected"))
    }

    async fn verified_emails(&self) -> Result<VerifiedEmails, ApiError> {
        self.begin(ApiCall::VerifiedEmails)?;
        self.require_session()?;
        let backend = self.backend.read().unwrap();
        let verified: Vec<&Order> = backend
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Verified)
            .collect();

        let mut seen = BTreeSet::new();
        let emails: Vec<String> = verified
            .iter()
            .filter(|o| seen.insert(o.email.clone()))
            .map(|o| o.email.clone())
            .collect();

        Ok(VerifiedEmails {
            email_list: emails.join("\n"),
            count: emails.len(),
            emails,
            orders: verified
                .iter()
                .map(|o| VerifiedOrder {
                    email: o.email.clone(),
                    name: o.name.clone(),
                    amount: o.expected_amount,
                    created_at: o.created_at.clone(),
                })
                .collect(),
        })
    }

    async fn export_orders(&self) -> Result<String, ApiError> {
        self.begin(ApiCall::ExportOrders)?;
        self.require_session()?;
        let backend = self.backend.read().unwrap();
        let mut csv = String::from("id,name,email,status,expected_amount\n");
        for o in &backend.orders {
            csv.push_str(&format!(
                "{},{},{},{},{:.2}\n",
                o.id, o.name, o.email, o.status, o.expected_amount
            ));
        }
        Ok(csv)
    }

    async fn rerun_matching(&self) -> Result<Ack, ApiError> {
        self.begin(ApiCall::RerunMatching)?;
        self.require_session()?;
        Ok(ack("Matching completed"))
    }

    async fn waves(&self) -> Result<Vec<Wave>, ApiError> {
        self.begin(ApiCall::Waves)?;
        Ok(self.backend.read().unwrap().waves.clone())
    }

    async fn current_wave(&self) -> Result<Option<Wave>, ApiError> {
        self.begin(ApiCall::CurrentWave)?;
        Ok(self.backend.read().unwrap().active_wave().cloned())
    }

    async fn create_wave(&self, form: WaveForm) -> Result<ApiResponse<Wave>, ApiError> {
        self.begin(ApiCall::CreateWave(form.name.clone()))?;
        self.require_session()?;
        let mut backend = self.backend.write().unwrap();
        let wave = Wave {
            id: backend.allocate_id(),
            name: form.name,
            start_date: form.start_date,
            end_date: form.end_date,
            boys_price: form.boys_price,
            girls_price: form.girls_price,
            is_active: form.is_active,
            created_at: "2025-01-01T12:00:00".to_string(),
        };
        backend.waves.push(wave.clone());
        Ok(with_data(wave, "Wave created"))
    }

    async fn update_wave(&self, id: i64, update: WaveUpdate) -> Result<ApiResponse<Wave>, ApiError> {
        self.begin(ApiCall::UpdateWave(id, update.clone()))?;
        self.require_session()?;
        let mut backend = self.backend.write().unwrap();
        let wave = backend
            .waves
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| not_found("Wave"))?;
        if let Some(name) = update.name {
            wave.name = name;
        }
        if let Some(start) = update.start_date {
            wave.start_date = start;
        }
        if let Some(end) = update.end_date {
            wave.end_date = end;
        }
        if let Some(price) = update.boys_price {
            wave.boys_price = price;
        }
        if let Some(price) = update.girls_price {
            wave.girls_price = price;
        }
        if let Some(active) = update.is_active {
            wave.is_active = active;
        }
        Ok(with_data(wave.clone(), "Wave updated"))
    }

    async fn delete_wave(&self, id: i64) -> Result<Ack, ApiError> {
        self.begin(ApiCall::DeleteWave(id))?;
        self.require_session()?;
        let mut backend = self.backend.write().unwrap();
        let before = backend.waves.len();
        backend.waves.retain(|w| w.id != id);
        if backend.waves.len() == before {
            return Err(not_found("Wave"));
        }
        Ok(ack("Wave deleted"))
    }

    async fn venmo_transactions(&self) -> Result<Vec<Transaction>, ApiError> {
        self.begin(ApiCall::Transactions(TransactionKind::Venmo))?;
        self.require_session()?;
        Ok(self.backend.read().unwrap().venmo.clone())
    }

    async fn zelle_transactions(&self) -> Result<Vec<ZelleTransaction>, ApiError> {
        self.begin(ApiCall::Transactions(TransactionKind::Zelle))?;
        self.require_session()?;
        Ok(self.backend.read().unwrap().zelle.clone())
    }

    async fn export_transactions(&self, kind: TransactionKind) -> Result<String, ApiError> {
        self.begin(ApiCall::ExportTransactions(kind))?;
        self.require_session()?;
        Ok(format!("{} export\n", kind.segment()))
    }

    async fn upload_csv(&self, file: UploadFile) -> Result<ApiResponse<CsvImport>, ApiError> {
        self.begin(ApiCall::UploadCsv(file.file_name.clone()))?;
        self.require_session()?;
        let mut backend = self.backend.write().unwrap();
        let rows = u32::try_from(file.bytes.iter().filter(|b| **b == b'\n').count()).unwrap_or(0);
        let upload_type = if file.file_name.to_lowercase().contains("zelle") {
            UploadType::Zelle
        } else {
            UploadType::Venmo
        };
        let upload = CsvUpload {
            id: backend.allocate_id(),
            filename: file.file_name.clone(),
            original_filename: file.file_name,
            file_size: file.bytes.len() as u64,
            upload_type,
            records_processed: rows,
            new_records: rows,
            updated_records: 0,
            admin_user: backend.username.clone(),
            upload_date: "2025-01-01T12:00:00".to_string(),
            status: backend.next_upload_status,
        };
        let import = CsvImport {
            filename: upload.filename.clone(),
            original_filename: upload.original_filename.clone(),
            upload_type: upload.upload_type,
            records_processed: upload.records_processed,
            new_records: upload.new_records,
            updated_records: upload.updated_records,
            status: (upload.status != UploadStatus::Success).then_some(upload.status),
        };
        backend.uploads.push(upload);
        Ok(with_data(import, "CSV uploaded"))
    }

    async fn csv_uploads(&self) -> Result<Vec<CsvUpload>, ApiError> {
        self.begin(ApiCall::CsvUploads)?;
        self.require_session()?;
        Ok(self.backend.read().unwrap().uploads.clone())
    }

    async fn analytics(&self) -> Result<Analytics, ApiError> {
        self.begin(ApiCall::Analytics)?;
        self.require_session()?;
        let backend = self.backend.read().unwrap();
        let count = |pred: &dyn Fn(OrderStatus) -> bool| {
            backend.orders.iter().filter(|o| pred(o.status)).count() as u64
        };

        let mut analytics = Analytics {
            total_orders: backend.orders.len() as u64,
            pending_orders: count(&|s| s == OrderStatus::Pending),
            approved_orders: count(&|s| s == OrderStatus::Verified),
            rejected_orders: count(&|s| s == OrderStatus::Rejected),
            total_revenue: backend
                .orders
                .iter()
                .filter(|o| o.status.is_success_like())
                .map(|o| o.expected_amount)
                .sum(),
            venmo_transactions: backend.venmo.len() as u64,
            zelle_transactions: backend.zelle.len() as u64,
            ..Analytics::default()
        };
        for order in &backend.orders {
            *analytics
                .orders_by_status
                .entry(order.status.to_string())
                .or_default() += 1;
            if let Some(wave) = &order.wave_name {
                *analytics.orders_by_wave.entry(wave.clone()).or_default() += 1;
            }
        }
        analytics.recent_orders = backend.orders.iter().rev().take(5).cloned().collect();
        Ok(analytics)
    }

    fn receipt_url(&self, receipt_path: &str) -> String {
        format!("http://mock.invalid/api/receipts/{receipt_path}")
    }
}
