//! End-to-end flows through the console shell against the in-memory backend

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use ticket_verifier::app::Console;
use ticket_verifier::dashboard::{DashboardAction, Notice};
use ticket_verifier::environment::ConsoleEnvironment;
use ticket_verifier::order_form::{OrderFormAction, Submission};
use ticket_verifier::router::Route;
use ticket_verifier_api::storage::keys;
use ticket_verifier_api::{LocalStore, LoginRequest, MemoryStore, OrderStatus, SessionEvents, UploadFile};
use ticket_verifier_testing::{ApiCall, MockApi, fixtures, test_clock};

struct Setup {
    console: Console,
    api: MockApi,
    storage: Arc<MemoryStore>,
}

async fn start(api: MockApi, route: Route) -> Setup {
    let session = SessionEvents::new();
    let api = api.with_session(session.clone());
    let storage = Arc::new(MemoryStore::new());
    let env = ConsoleEnvironment::new(
        Arc::new(api.clone()),
        storage.clone(),
        Arc::new(test_clock()),
        session,
    );
    let console = Console::start(env, route).await.unwrap();
    Setup {
        console,
        api,
        storage,
    }
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn customer_submits_an_order() {
    let Setup {
        console,
        api,
        storage,
    } = start(
        MockApi::new().with_waves(vec![fixtures::wave(1, true)]),
        Route::OrderForm,
    )
    .await;
    let form = &console.order_form;

    form.send(OrderFormAction::Mount).unwrap().wait().await;
    for action in [
        OrderFormAction::SetName("Ada Lovelace".into()),
        OrderFormAction::SetEmail("ada@example.org".into()),
        OrderFormAction::SetBoysTickets(2),
        OrderFormAction::SetGirlsTickets(1),
        OrderFormAction::SelectReceipt(vec![UploadFile::new(
            "venmo.png",
            "image/png",
            vec![0x89, b'P', b'N', b'G'],
        )]),
    ] {
        form.send(action).unwrap().wait().await;
    }
    assert!(storage.get(keys::CUSTOMER_FORM).unwrap().is_some());

    // 2 x 15.00 + 1 x 12.50
    let total = form.state(|s| s.quote().total).unwrap();
    assert_eq!(total.cents(), 4250);

    form.send(OrderFormAction::Submit).unwrap().wait().await;

    let (submission, draft_name) = form.state(|s| (s.submission.clone(), s.draft.name.clone()));
    assert!(matches!(submission, Submission::Succeeded { order_id: Some(101), .. }));
    assert!(draft_name.is_empty());
    assert!(storage.get(keys::CUSTOMER_FORM).unwrap().is_none());
    assert_eq!(
        api.count(|c| matches!(c, ApiCall::CreateOrder { .. })),
        1
    );
    console.shutdown();
}

#[tokio::test]
async fn admin_logs_in_and_approves_an_order() {
    let Setup { console, api, .. } = start(
        MockApi::new().with_orders(vec![fixtures::order(5, OrderStatus::Pending)]),
        Route::Admin,
    )
    .await;
    eventually(|| console.current_route() == Some(Route::Login)).await;

    let wrong = console
        .login(LoginRequest {
            username: "admin".into(),
            password: "nope".into(),
        })
        .await
        .unwrap();
    assert!(!wrong);

    let ok = console
        .login(LoginRequest {
            username: "admin".into(),
            password: "admin123".into(),
        })
        .await
        .unwrap();
    assert!(ok);
    eventually(|| console.current_route() == Some(Route::Admin)).await;

    console
        .dashboard
        .send(DashboardAction::ApproveOrder(5))
        .unwrap()
        .wait()
        .await;

    assert_eq!(
        console.dashboard.state(|s| s.notice.clone()),
        Some(Notice::Success("Order approved".to_string()))
    );
    assert_eq!(api.all_orders()[0].status, OrderStatus::Approved);
    console.shutdown();
}

#[tokio::test]
async fn navigating_to_csv_tab_after_login() {
    let Setup { console, .. } = start(MockApi::new().authenticated(), Route::OrderForm).await;
    eventually(|| console.router.state(|s| s.is_authenticated)).await;

    let shown = console.navigate(Route::CsvManagement).unwrap();
    assert_eq!(shown, Some(Route::CsvManagement));
    eventually(|| console.dashboard.state(|s| s.csv_uploads.data().is_some())).await;
    console.shutdown();
}
