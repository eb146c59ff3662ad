use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use api_types::transaction::{Transaction, TransactionNew};
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use client::{
    ApiClient, CancellationToken, ClientError, FileStorage, Persister, QueryCache, QueryOptions,
    StaticToken, TokenError, TokenProvider, Transactions,
};
use engine::{Category, Money, TransactionForm, TransactionKind};

#[derive(Clone, Default)]
struct MockApi {
    transactions: Arc<Mutex<Vec<Transaction>>>,
    posted: Arc<Mutex<Vec<serde_json::Value>>>,
    auth_headers: Arc<Mutex<Vec<Option<String>>>>,
    list_calls: Arc<AtomicUsize>,
    fail_lists: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
}

impl MockApi {
    fn record_auth(&self, headers: &HeaderMap) {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.auth_headers.lock().unwrap().push(value);
    }

    fn seed(&self, id: &str, user_id: &str, title: &str, kobo: i64) {
        self.transactions.lock().unwrap().push(Transaction {
            id: id.to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            amount: Money::new(kobo),
            category: Category::Other,
            description: None,
            date: Some("2026-10-15T08:00:00.000Z".to_string()),
            created_at: None,
        });
    }
}

async fn list(
    State(api): State<MockApi>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<Transaction>>, (StatusCode, Json<serde_json::Value>)> {
    api.record_auth(&headers);
    api.list_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let remaining = api.fail_lists.load(Ordering::SeqCst);
    if remaining > 0 {
        api.fail_lists.store(remaining - 1, Ordering::SeqCst);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "message": "database unavailable" })),
        ));
    }

    let items = api
        .transactions
        .lock()
        .unwrap()
        .iter()
        .filter(|tx| tx.user_id == user_id)
        .cloned()
        .collect();
    Ok(Json(items))
}

async fn create(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<Transaction>), StatusCode> {
    api.record_auth(&headers);
    api.posted.lock().unwrap().push(body.clone());

    let new: TransactionNew =
        serde_json::from_value(body).map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;
    let id = format!("tx_{}", api.next_id.fetch_add(1, Ordering::SeqCst));
    let tx = Transaction {
        id,
        user_id: new.user_id,
        title: new.title,
        amount: new.amount,
        category: new.category,
        description: Some(new.description),
        date: Some("2026-10-15T09:00:00.000Z".to_string()),
        created_at: None,
    };
    api.transactions.lock().unwrap().push(tx.clone());
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn remove(
    State(api): State<MockApi>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, (StatusCode, Json<serde_json::Value>)> {
    api.record_auth(&headers);
    let mut items = api.transactions.lock().unwrap();
    let before = items.len();
    items.retain(|tx| tx.id != id);
    if items.len() == before {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Transaction not found" })),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn spawn_mock(api: MockApi) -> SocketAddr {
    let router = Router::new()
        .route("/api/v1/transaction", post(create))
        .route("/api/v1/transaction/{id}", get(list).delete(remove))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn fast_options() -> QueryOptions {
    QueryOptions {
        retry_delay: Duration::from_millis(1),
        ..QueryOptions::default()
    }
}

fn transactions_for(
    addr: SocketAddr,
    tokens: Arc<dyn TokenProvider>,
    cache: Arc<QueryCache>,
) -> Transactions {
    let api = ApiClient::new(&format!("http://{addr}"), tokens).unwrap();
    Transactions::new(api, cache, "user_1")
}

async fn setup() -> (MockApi, Transactions) {
    let mock = MockApi::default();
    let addr = spawn_mock(mock.clone()).await;
    let tokens = Arc::new(StaticToken::new(Some("sess_123".to_string())));
    let transactions = transactions_for(addr, tokens, Arc::new(QueryCache::new(fast_options())));
    (mock, transactions)
}

fn coffee_form() -> TransactionForm {
    TransactionForm {
        title: "Coffee".to_string(),
        amount: "3.5".to_string(),
        category: "Food & Drinks".to_string(),
        kind: TransactionKind::Expense,
        description: String::new(),
    }
}

struct FailingToken;

#[async_trait]
impl TokenProvider for FailingToken {
    async fn token(&self) -> Result<Option<String>, TokenError> {
        Err(TokenError::Command("identity provider unreachable".to_string()))
    }
}

#[tokio::test]
async fn list_returns_only_the_users_transactions_in_server_order() {
    let (mock, transactions) = setup().await;
    mock.seed("a", "user_1", "Salary", 500_000);
    mock.seed("b", "user_2", "Not mine", -100);
    mock.seed("c", "user_1", "Rent", -200_000);

    let cancel = CancellationToken::new();
    let state = transactions.list(&cancel).await.unwrap();

    assert!(state.is_success());
    let ids: Vec<_> = state.data.unwrap().into_iter().map(|tx| tx.id).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn empty_list_is_reported_as_empty() {
    let (_mock, transactions) = setup().await;
    let state = transactions.list(&CancellationToken::new()).await.unwrap();
    assert!(state.is_empty());
    assert!(!state.is_loading());
}

#[tokio::test]
async fn requests_carry_the_bearer_token() {
    let (mock, transactions) = setup().await;
    transactions.list(&CancellationToken::new()).await.unwrap();

    let headers = mock.auth_headers.lock().unwrap().clone();
    assert_eq!(headers, vec![Some("Bearer sess_123".to_string())]);
}

#[tokio::test]
async fn token_failure_sends_the_request_unauthenticated() {
    let mock = MockApi::default();
    let addr = spawn_mock(mock.clone()).await;
    let transactions = transactions_for(
        addr,
        Arc::new(FailingToken),
        Arc::new(QueryCache::new(fast_options())),
    );

    let state = transactions.list(&CancellationToken::new()).await.unwrap();
    assert!(state.is_success());
    assert_eq!(mock.auth_headers.lock().unwrap().clone(), vec![None]);
}

#[tokio::test]
async fn created_expense_is_posted_negative_and_shows_up_in_the_next_read() {
    let (mock, transactions) = setup().await;
    let cancel = CancellationToken::new();

    let before = transactions.list(&cancel).await.unwrap();
    assert!(before.is_empty());

    let valid = coffee_form().validate().unwrap();
    transactions.create(valid, &cancel).await.unwrap();

    let posted = mock.posted.lock().unwrap().clone();
    assert_eq!(
        posted,
        vec![serde_json::json!({
            "userId": "user_1",
            "title": "Coffee",
            "amount": -3.5,
            "category": "Food & Drinks",
            "description": ""
        })]
    );

    assert!(transactions.cached().is_stale);
    let after = transactions.list(&cancel).await.unwrap();
    let items = after.data.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Coffee");
    assert_eq!(items[0].amount, Money::new(-350));
    assert_eq!(mock.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn deleted_transaction_is_gone_from_the_next_read() {
    let (mock, transactions) = setup().await;
    mock.seed("x", "user_1", "Lunch", -2_500);
    mock.seed("y", "user_1", "Bus", -500);
    let cancel = CancellationToken::new();

    let before = transactions.list(&cancel).await.unwrap();
    assert_eq!(before.data.unwrap().len(), 2);

    transactions.delete("x", &cancel).await.unwrap();

    let after = transactions.list(&cancel).await.unwrap();
    let ids: Vec<_> = after.data.unwrap().into_iter().map(|tx| tx.id).collect();
    assert_eq!(ids, vec!["y"]);
}

#[tokio::test]
async fn deleting_a_missing_transaction_maps_to_not_found() {
    let (_mock, transactions) = setup().await;
    let err = transactions
        .delete("missing", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound));
}

#[tokio::test]
async fn fresh_list_is_served_from_cache() {
    let (mock, transactions) = setup().await;
    let cancel = CancellationToken::new();

    transactions.list(&cancel).await.unwrap();
    transactions.list(&cancel).await.unwrap();
    assert_eq!(mock.list_calls.load(Ordering::SeqCst), 1);

    transactions.refresh(&cancel).await.unwrap();
    assert_eq!(mock.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_pull_to_refresh_is_coalesced() {
    let (mock, transactions) = setup().await;
    mock.seed("a", "user_1", "Salary", 500_000);

    let handles: Vec<_> = (0..4)
        .map(|_| transactions.spawn_refresh(CancellationToken::new()))
        .collect();
    for handle in handles {
        let state = handle.await.unwrap().unwrap();
        assert_eq!(state.data.unwrap().len(), 1);
    }

    assert_eq!(mock.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_errors_are_retried_then_surfaced() {
    let (mock, transactions) = setup().await;
    mock.fail_lists.store(10, Ordering::SeqCst);

    let state = transactions.list(&CancellationToken::new()).await.unwrap();
    assert!(state.is_error());
    assert_eq!(
        state.error.as_deref(),
        Some("server error (500): database unavailable")
    );
    assert_eq!(mock.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn transient_server_error_recovers_within_retry_budget() {
    let (mock, transactions) = setup().await;
    mock.seed("a", "user_1", "Salary", 500_000);
    mock.fail_lists.store(2, Ordering::SeqCst);

    let state = transactions.list(&CancellationToken::new()).await.unwrap();
    assert!(state.is_success());
    assert_eq!(mock.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn cancelled_create_does_not_invalidate() {
    let (mock, transactions) = setup().await;
    let cancel = CancellationToken::new();
    transactions.list(&cancel).await.unwrap();

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = transactions
        .create(coffee_form().validate().unwrap(), &cancelled)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Cancelled));
    assert!(!transactions.cached().is_stale);
    assert_eq!(mock.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transactions = transactions_for(
        addr,
        Arc::new(StaticToken::default()),
        Arc::new(QueryCache::new(QueryOptions {
            retry: 0,
            ..fast_options()
        })),
    );
    let err = transactions
        .create(coffee_form().validate().unwrap(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn list_survives_a_restart_through_file_storage() {
    let mock = MockApi::default();
    mock.seed("a", "user_1", "Salary", 500_000);
    let addr = spawn_mock(mock.clone()).await;
    let dir = std::env::temp_dir().join(format!("kudi_cache_{}", uuid::Uuid::new_v4()));
    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticToken::default());
    let cancel = CancellationToken::new();

    {
        let cache = Arc::new(QueryCache::with_persister(
            fast_options(),
            Persister::new(Arc::new(FileStorage::new(&dir))),
        ));
        let transactions = transactions_for(addr, tokens.clone(), cache);
        transactions.list(&cancel).await.unwrap();
    }

    let cache = Arc::new(QueryCache::with_persister(
        fast_options(),
        Persister::new(Arc::new(FileStorage::new(&dir))),
    ));
    assert_eq!(cache.restore().await.unwrap(), 1);

    let transactions = transactions_for(addr, tokens, cache);
    let state = transactions.list(&cancel).await.unwrap();
    assert_eq!(state.data.unwrap()[0].title, "Salary");
    assert_eq!(mock.list_calls.load(Ordering::SeqCst), 1);

    std::fs::remove_dir_all(dir).unwrap();
}
