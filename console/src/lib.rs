//! # Ticket Verifier Console
//!
//! Customer order form and admin console for the Ticket Verifier backend.
//!
//! Every screen is a [`Reducer`](ticket_verifier_core::reducer::Reducer)
//! driven by a [`Store`](ticket_verifier_runtime::Store):
//!
//! - [`auth`]: session validation, login, logout, password change
//! - [`order_form`]: ticket request with live pricing, receipt upload, and a
//!   locally persisted draft
//! - [`dashboard`]: orders, pricing waves, CSV imports, analytics
//! - [`router`]: routes and session guards
//!
//! [`app::Console`] wires them to the session event bus, and [`cli`] exposes
//! them as commands.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticket_verifier::app::Console;
//! use ticket_verifier::environment::ConsoleEnvironment;
//! use ticket_verifier::order_form::OrderFormAction;
//! use ticket_verifier::router::Route;
//! use ticket_verifier_api::{ApiClient, ApiConfig, MemoryStore, SessionEvents};
//! use ticket_verifier_core::environment::SystemClock;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = SessionEvents::new();
//!     let storage = Arc::new(MemoryStore::new());
//!     let api = ApiClient::new(ApiConfig::from_env(), storage.clone(), session.clone())?;
//!     let env = ConsoleEnvironment::new(Arc::new(api), storage, Arc::new(SystemClock), session);
//!
//!     let console = Console::start(env, Route::OrderForm).await?;
//!     console.order_form.send(OrderFormAction::Mount)?.wait().await;
//!     console.order_form.send(OrderFormAction::SetBoysTickets(2))?;
//!
//!     println!("{:?}", console.order_form.state(|s| s.quote().total));
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod draft;
pub mod environment;
pub mod order_form;
pub mod pricing;
pub mod query;
pub mod receipt;
pub mod router;
pub mod validation;

#[cfg(test)]
mod test_support;
