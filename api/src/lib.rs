//! # Ticket Verifier API Client
//!
//! Typed client for the Ticket Verifier backend: orders, pricing waves,
//! payment-app CSV imports, analytics, and session authentication.
//!
//! The backend is authoritative for everything. This crate only shapes
//! requests, decodes responses, and centralises the cross-cutting behaviour
//! every caller needs: base URL, session cookies, the request timeout, and the
//! global `401` handling.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticket_verifier_api::{ApiClient, ApiConfig, MemoryStore, SessionEvents, TicketApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(
//!         ApiConfig::from_env(),
//!         Arc::new(MemoryStore::new()),
//!         SessionEvents::new(),
//!     )?;
//!
//!     match client.current_wave().await? {
//!         Some(wave) => println!("{} is on sale", wave.name),
//!         None => println!("No active wave"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod types;

// Re-export main types for convenience
pub use client::{ApiClient, TicketApi};
pub use config::ApiConfig;
pub use error::ApiError;
pub use session::{SessionEvent, SessionEvents};
pub use storage::{FileStore, LocalStore, MemoryStore, StorageError};
pub use types::{
    Ack, AdminUser, Analytics, ApiResponse, CsvImport, CsvUpload, LoginRequest, LoginResponse, NewOrder,
    Order, OrderStatus, OrderUpdate, PaginatedResponse, PasswordChange, SearchFilters,
    SessionStatus, Transaction, TransactionKind, UploadFile, UploadStatus, UploadType,
    VerifiedEmails, VerifiedOrder, Wave, WaveForm, WaveUpdate, ZelleTransaction,
};
