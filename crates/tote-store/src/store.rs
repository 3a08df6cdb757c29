//! # Store
//!
//! One state tree, one lock, many subscribers.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Store                                      │
//! │                                                                         │
//! │  caller ──► dispatch(action) ──► Mutex<AppState> ──► reduce()          │
//! │                                        │                                │
//! │                      ┌─────────────────┼──────────────────┐             │
//! │                      ▼                 ▼                  ▼             │
//! │               watch::Sender     projection changed?   Stale? → log     │
//! │               (subscribers)            │                                │
//! │                                        ▼                                │
//! │                                 PersistWriter (auth, cart only)        │
//! │                                                                         │
//! │  async ops (login, fetch_all_products, fetch_product_by_id):           │
//! │    1. dispatch Pending, read back its sequence number (same lock)      │
//! │    2. await CatalogApi under tokio::time::timeout (lock NOT held)      │
//! │    3. dispatch Fulfilled(seq) / Rejected(seq)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup
//! ```text
//! StoreBuilder::build()  ──► not ready, writes suppressed
//!        │
//!        ▼
//! Store::rehydrate()     ──► read <prefix>:auth, <prefix>:cart
//!        │                   merge into state
//!        ▼
//! ready = true           ──► mutations of auth/cart are persisted
//! ```
//!
//! `Store::open` does both steps.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use tote_api::{ApiResult, CatalogApi, DEFAULT_TIMEOUT_SECS};
use tote_core::{
    Action, AppState, AuthAction, CartAction, CartSnapshot, CatalogAction, Credentials, Outcome,
    Product, ProductId, RequestError, RequestSeq, SessionSnapshot, StaleResponsePolicy, User,
};
use tote_db::KeyValueStorage;

use crate::checkout::CheckoutReceipt;
use crate::config::{ToteConfig, DEFAULT_KEY_PREFIX};
use crate::error::{StoreError, StoreResult};
use crate::persist::{self, PersistWriter, PersistedSlice};

// =============================================================================
// Options
// =============================================================================

/// Runtime options of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub stale_responses: StaleResponsePolicy,
    pub key_prefix: String,
    /// Upper bound on every async operation, on top of the HTTP client's
    /// own timeout.
    pub request_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            stale_responses: StaleResponsePolicy::default(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl From<&ToteConfig> for StoreOptions {
    fn from(config: &ToteConfig) -> Self {
        StoreOptions {
            stale_responses: config.store.stale_responses,
            key_prefix: config.storage.key_prefix.clone(),
            request_timeout: config.request_timeout(),
        }
    }
}

// =============================================================================
// Persisted Projection
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Projection {
    Auth(SessionSnapshot),
    Cart(CartSnapshot),
}

impl Projection {
    fn of(state: &AppState, slice: PersistedSlice) -> Self {
        match slice {
            PersistedSlice::Auth => Projection::Auth(state.auth.snapshot()),
            PersistedSlice::Cart => Projection::Cart(state.cart.snapshot()),
        }
    }

    fn slice(&self) -> PersistedSlice {
        match self {
            Projection::Auth(_) => PersistedSlice::Auth,
            Projection::Cart(_) => PersistedSlice::Cart,
        }
    }

    fn encode(&self) -> StoreResult<String> {
        match self {
            Projection::Auth(session) => persist::encode(session),
            Projection::Cart(cart) => persist::encode(cart),
        }
    }
}

fn persisted_slice(action: &Action) -> Option<PersistedSlice> {
    match action {
        Action::Auth(_) => Some(PersistedSlice::Auth),
        Action::Cart(_) => Some(PersistedSlice::Cart),
        Action::Catalog(_) => None,
    }
}

// =============================================================================
// Store
// =============================================================================

struct Inner {
    state: Mutex<AppState>,
    state_tx: watch::Sender<Arc<AppState>>,
    ready_tx: watch::Sender<bool>,
    rehydration_started: AtomicBool,
    persistence_enabled: AtomicBool,
    api: Arc<dyn CatalogApi>,
    storage: Option<Arc<dyn KeyValueStorage>>,
    writer: Option<PersistWriter>,
    options: StoreOptions,
}

/// Handle to the client state. Clones share the same store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("options", &self.inner.options)
            .field("ready", &self.is_ready())
            .field("persistent", &self.inner.storage.is_some())
            .finish()
    }
}

impl Store {
    /// Builds a store, rehydrates it from `storage` and returns it ready.
    pub async fn open(
        api: Arc<dyn CatalogApi>,
        storage: Arc<dyn KeyValueStorage>,
        options: StoreOptions,
    ) -> StoreResult<Self> {
        let store = StoreBuilder::new(api)
            .with_storage(storage)
            .with_options(options)
            .build()?;
        store.rehydrate().await;
        Ok(store)
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    // =========================================================================
    // State Access
    // =========================================================================

    /// Latest published state.
    pub fn state(&self) -> Arc<AppState> {
        self.inner.state_tx.borrow().clone()
    }

    /// Receiver that sees every published state (intermediate values may be
    /// skipped by slow readers; the latest is always observed).
    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.inner.state_tx.subscribe()
    }

    /// Applies one action to its slice and publishes the result.
    pub fn dispatch(&self, action: impl Into<Action>) -> Outcome {
        let mut state = self.lock();
        self.apply_locked(&mut state, action.into())
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reduce, publish, persist. Runs with the state lock held.
    fn apply_locked(&self, state: &mut AppState, action: Action) -> Outcome {
        let slice = persisted_slice(&action);
        let before = slice.map(|s| Projection::of(state, s));

        let outcome = state.reduce(action, self.inner.options.stale_responses);

        match outcome {
            Outcome::Applied => {
                self.inner.state_tx.send_replace(Arc::new(state.clone()));

                if let (Some(slice), Some(before)) = (slice, before) {
                    let after = Projection::of(state, slice);
                    if after != before {
                        self.persist(&after);
                    }
                }
            }
            Outcome::Stale {
                operation,
                response,
                latest,
            } => {
                debug!(
                    operation = %operation,
                    response = %response,
                    latest = %latest,
                    "Dropped stale response"
                );
            }
            Outcome::NoOp => {}
        }

        outcome
    }

    fn persist(&self, projection: &Projection) {
        let Some(writer) = &self.inner.writer else {
            return;
        };
        if !self.is_ready() {
            debug!(slice = projection.slice().name(), "Write suppressed until rehydrated");
            return;
        }
        if !self.inner.persistence_enabled.load(Ordering::SeqCst) {
            return;
        }

        match projection.encode() {
            Ok(blob) => writer.set(projection.slice().key(&self.inner.options.key_prefix), blob),
            Err(e) => error!(error = %e, "Could not encode snapshot"),
        }
    }

    // =========================================================================
    // Readiness & Rehydration
    // =========================================================================

    pub fn ready(&self) -> watch::Receiver<bool> {
        self.inner.ready_tx.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready_tx.borrow()
    }

    pub async fn wait_until_ready(&self) {
        let mut ready = self.ready();
        // The sender lives as long as the store, so this only errors if
        // the store is gone.
        let _ = ready.wait_for(|r| *r).await;
    }

    /// Reads the persisted snapshots once and flips the store to ready.
    ///
    /// A snapshot that can't be decoded is discarded. A storage read
    /// failure disables persistence for the rest of the run.
    pub async fn rehydrate(&self) {
        if self.inner.rehydration_started.swap(true, Ordering::SeqCst) {
            self.wait_until_ready().await;
            return;
        }

        if let Some(storage) = self.inner.storage.clone() {
            for slice in PersistedSlice::ALL {
                let key = slice.key(&self.inner.options.key_prefix);
                match storage.get(&key).await {
                    Ok(Some(blob)) => self.restore(slice, &key, &blob),
                    Ok(None) => debug!(key = %key, "No snapshot stored"),
                    Err(e) => {
                        error!(
                            key = %key,
                            error = %e,
                            "Snapshot read failed; running without persistence"
                        );
                        self.inner.persistence_enabled.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        }

        self.inner.ready_tx.send_replace(true);
        info!("Store ready");
    }

    fn restore(&self, slice: PersistedSlice, key: &str, blob: &str) {
        let restored = match slice {
            PersistedSlice::Auth => persist::decode::<SessionSnapshot>(key, blob).map(|session| {
                self.dispatch(AuthAction::Rehydrate(session));
            }),
            PersistedSlice::Cart => persist::decode::<CartSnapshot>(key, blob).map(|cart| {
                if !cart.is_consistent() {
                    warn!(key = %key, "Stored cart totals disagree with its lines; recomputing");
                }
                self.dispatch(CartAction::Rehydrate(cart));
            }),
        };

        match restored {
            Ok(()) => info!(key = %key, "Snapshot restored"),
            Err(e) => warn!(key = %key, error = %e, "Discarding snapshot"),
        }
    }

    // =========================================================================
    // Persistence Control
    // =========================================================================

    /// Waits until every queued snapshot write reached storage.
    pub async fn flush(&self) {
        if let Some(writer) = &self.inner.writer {
            writer.flush().await;
        }
    }

    /// Deletes the persisted snapshots. In-memory state is untouched.
    pub async fn purge(&self) {
        let Some(writer) = &self.inner.writer else {
            return;
        };
        if !self.inner.persistence_enabled.load(Ordering::SeqCst) {
            warn!("Persistence disabled; nothing to purge");
            return;
        }
        for slice in PersistedSlice::ALL {
            writer.remove(slice.key(&self.inner.options.key_prefix));
        }
        writer.flush().await;
        info!("Persisted snapshots purged");
    }

    // =========================================================================
    // Async Operations
    // =========================================================================

    /// Dispatches a Pending action and returns the sequence number it was
    /// given, under one lock.
    fn begin(&self, action: impl Into<Action>, seq: impl FnOnce(&AppState) -> RequestSeq) -> RequestSeq {
        let mut state = self.lock();
        self.apply_locked(&mut state, action.into());
        seq(&state)
    }

    async fn run_request<T>(
        &self,
        request: impl Future<Output = ApiResult<T>>,
    ) -> Result<T, RequestError> {
        let limit = self.inner.options.request_timeout;
        match tokio::time::timeout(limit, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(RequestError::timeout(limit.as_secs().max(1))),
        }
    }

    /// Logs in. On success the session holds the token and the username as
    /// typed; on failure `last_error` is set and `is_authenticated` is left
    /// as it was.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, RequestError> {
        let seq = self.begin(AuthAction::LoginPending, |s| s.auth.latest_login());
        info!(username = %credentials.username(), seq = %seq, "Login started");

        match self.run_request(self.inner.api.login(credentials)).await {
            Ok(token) => {
                let username = credentials.username().to_string();
                self.dispatch(AuthAction::LoginFulfilled {
                    seq,
                    username: username.clone(),
                    token,
                });
                info!(username = %username, "Login succeeded");
                Ok(User { username })
            }
            Err(error) => {
                warn!(error = %error, "Login failed");
                self.dispatch(AuthAction::LoginRejected {
                    seq,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Resets the session.
    pub fn logout(&self) {
        self.dispatch(AuthAction::Logout);
        info!("Logged out");
    }

    /// Fetches the product list. A failure keeps the current items.
    pub async fn fetch_all_products(&self) -> Result<Vec<Product>, RequestError> {
        let seq = self.begin(CatalogAction::FetchAllPending, |s| s.catalog.latest_list());
        debug!(seq = %seq, "Fetching products");

        match self.run_request(self.inner.api.fetch_products()).await {
            Ok(products) => {
                info!(count = products.len(), "Products loaded");
                self.dispatch(CatalogAction::FetchAllFulfilled {
                    seq,
                    products: products.clone(),
                });
                Ok(products)
            }
            Err(error) => {
                warn!(error = %error, "Fetching products failed");
                self.dispatch(CatalogAction::FetchAllRejected {
                    seq,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Fetches one product into `selected_product`.
    pub async fn fetch_product_by_id(&self, id: ProductId) -> Result<Product, RequestError> {
        let seq = self.begin(CatalogAction::FetchByIdPending, |s| s.catalog.latest_detail());
        debug!(seq = %seq, product_id = %id, "Fetching product");

        match self.run_request(self.inner.api.fetch_product(id)).await {
            Ok(product) => {
                self.dispatch(CatalogAction::FetchByIdFulfilled {
                    seq,
                    product: product.clone(),
                });
                Ok(product)
            }
            Err(error) => {
                warn!(product_id = %id, error = %error, "Fetching product failed");
                self.dispatch(CatalogAction::FetchByIdRejected {
                    seq,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    pub fn clear_selected_product(&self) {
        self.dispatch(CatalogAction::ClearSelectedProduct);
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub fn add_to_cart(&self, product: Product) {
        debug!(product_id = %product.id, "Add to cart");
        self.dispatch(CartAction::Add(product));
    }

    pub fn remove_from_cart(&self, id: ProductId) {
        self.dispatch(CartAction::Remove(id));
    }

    /// `quantity <= 0` removes the line; larger values are clamped.
    pub fn set_quantity(&self, id: ProductId, quantity: i64) {
        self.dispatch(CartAction::SetQuantity { id, quantity });
    }

    pub fn decrease_quantity(&self, id: ProductId) {
        self.dispatch(CartAction::Decrease(id));
    }

    pub fn clear_cart(&self) {
        self.dispatch(CartAction::Clear);
    }

    /// Places a simulated order: returns a receipt and empties the cart.
    /// An empty cart yields `None` and changes nothing.
    pub fn checkout(&self) -> Option<CheckoutReceipt> {
        let mut state = self.lock();
        let receipt = CheckoutReceipt::from_cart(&state.cart)?;
        self.apply_locked(&mut state, CartAction::Clear.into());

        info!(
            order_id = %receipt.order_id,
            items = receipt.item_count,
            total = %receipt.total_amount,
            "Order placed"
        );
        Some(receipt)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Store`].
pub struct StoreBuilder {
    api: Arc<dyn CatalogApi>,
    storage: Option<Arc<dyn KeyValueStorage>>,
    options: StoreOptions,
}

impl StoreBuilder {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        StoreBuilder {
            api,
            storage: None,
            options: StoreOptions::default(),
        }
    }

    /// Persists auth and cart through `storage`. Without it the store is
    /// memory-only.
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds a store that is NOT ready yet; call [`Store::rehydrate`].
    ///
    /// Needs a Tokio runtime when storage is configured (the writer task is
    /// spawned here).
    pub fn build(self) -> StoreResult<Store> {
        let writer = match &self.storage {
            Some(storage) => {
                let runtime =
                    tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
                let (writer, _task) = PersistWriter::spawn(Arc::clone(storage), &runtime);
                Some(writer)
            }
            None => None,
        };

        let initial = AppState::new();
        let (state_tx, _) = watch::channel(Arc::new(initial.clone()));
        let (ready_tx, _) = watch::channel(false);

        Ok(Store {
            inner: Arc::new(Inner {
                state: Mutex::new(initial),
                state_tx,
                ready_tx,
                rehydration_started: AtomicBool::new(false),
                persistence_enabled: AtomicBool::new(true),
                api: self.api,
                storage: self.storage,
                writer,
                options: self.options,
            }),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;
    use tote_api::ApiError;
    use tote_core::{ErrorKind, Money, Rating, RequestStatus};
    use tote_db::{DbError, DbResult, MemoryStorage};

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    type ListReply = ApiResult<Vec<Product>>;

    #[derive(Default)]
    struct FakeApi {
        products: Vec<Product>,
        delay: Mutex<Duration>,
        fail_list: AtomicBool,
        scripted: Mutex<VecDeque<oneshot::Receiver<ListReply>>>,
    }

    impl FakeApi {
        fn with_products(products: Vec<Product>) -> Self {
            FakeApi {
                products,
                ..FakeApi::default()
            }
        }

        fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = delay;
        }

        /// The next list call waits for the returned sender.
        fn script(&self) -> oneshot::Sender<ListReply> {
            let (tx, rx) = oneshot::channel();
            self.scripted.lock().unwrap().push_back(rx);
            tx
        }
    }

    #[async_trait]
    impl CatalogApi for FakeApi {
        async fn fetch_products(&self) -> ApiResult<Vec<Product>> {
            let scripted = self.scripted.lock().unwrap().pop_front();
            if let Some(reply) = scripted {
                return reply
                    .await
                    .unwrap_or_else(|_| Err(ApiError::Unreachable("reply dropped".into())));
            }

            let delay = *self.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    status: 503,
                    message: "maintenance".into(),
                });
            }
            Ok(self.products.clone())
        }

        async fn fetch_product(&self, id: ProductId) -> ApiResult<Product> {
            self.products
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))
        }

        async fn login(&self, credentials: &Credentials) -> ApiResult<String> {
            if credentials.username() == "johnd" && credentials.password() == "m38rmF$" {
                Ok("T".to_string())
            } else {
                Err(ApiError::Unauthorized(
                    "username or password is incorrect".into(),
                ))
            }
        }
    }

    struct FailingStorage;

    #[async_trait]
    impl KeyValueStorage for FailingStorage {
        async fn get(&self, _key: &str) -> DbResult<Option<String>> {
            Err(DbError::Unavailable("disk detached".into()))
        }
        async fn set(&self, _key: &str, _value: &str) -> DbResult<()> {
            Err(DbError::Unavailable("disk detached".into()))
        }
        async fn remove(&self, _key: &str) -> DbResult<()> {
            Err(DbError::Unavailable("disk detached".into()))
        }
    }

    /// Reads work, writes fail.
    struct ReadOnlyStorage(MemoryStorage);

    #[async_trait]
    impl KeyValueStorage for ReadOnlyStorage {
        async fn get(&self, key: &str) -> DbResult<Option<String>> {
            self.0.get(key).await
        }
        async fn set(&self, _key: &str, _value: &str) -> DbResult<()> {
            Err(DbError::QueryFailed("attempt to write a readonly database".into()))
        }
        async fn remove(&self, _key: &str) -> DbResult<()> {
            Err(DbError::QueryFailed("attempt to write a readonly database".into()))
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn product(id: u64, cents: i64) -> Product {
        Product {
            id: ProductId(id),
            title: format!("Product {id}"),
            price: Money::from_cents(cents),
            image: format!("https://example.test/{id}.jpg"),
            category: "electronics".to_string(),
            description: String::new(),
            rating: Rating::new(4.5, 12),
        }
    }

    fn catalog() -> Vec<Product> {
        vec![product(1, 1000), product(2, 550)]
    }

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials::new(username, password).unwrap()
    }

    async fn open_with(api: Arc<FakeApi>, storage: Arc<dyn KeyValueStorage>) -> Store {
        Store::open(api, storage, StoreOptions::default())
            .await
            .unwrap()
    }

    async fn open(storage: &MemoryStorage) -> Store {
        open_with(
            Arc::new(FakeApi::with_products(catalog())),
            Arc::new(storage.clone()),
        )
        .await
    }

    async fn wait_for_list_dispatch(store: &Store, seq: u64) {
        while store.state().catalog.latest_list().value() < seq {
            tokio::task::yield_now().await;
        }
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_same_product_twice() {
        let store = open(&MemoryStorage::new()).await;
        store.add_to_cart(product(1, 1000));
        store.add_to_cart(product(1, 1000));

        let state = store.state();
        assert_eq!(state.cart.line_items().len(), 1);
        assert_eq!(state.cart.total_item_count(), 2);
        assert_eq!(state.cart.total_amount().to_decimal_string(), "20.00");
    }

    #[tokio::test]
    async fn test_remove_one_of_two() {
        let store = open(&MemoryStorage::new()).await;
        store.add_to_cart(product(1, 1000));
        store.add_to_cart(product(2, 550));
        store.remove_from_cart(ProductId(1));

        let state = store.state();
        assert_eq!(state.cart.line_items().len(), 1);
        assert_eq!(state.cart.total_item_count(), 1);
        assert_eq!(state.cart.total_amount().to_decimal_string(), "5.50");
    }

    #[tokio::test]
    async fn test_quantity_operations() {
        let store = open(&MemoryStorage::new()).await;
        store.add_to_cart(product(1, 1000));
        store.set_quantity(ProductId(1), 4);
        store.decrease_quantity(ProductId(1));
        assert_eq!(store.state().cart.total_item_count(), 3);

        store.set_quantity(ProductId(1), -5);
        assert!(store.state().cart.is_empty());

        store.add_to_cart(product(2, 550));
        store.clear_cart();
        assert!(store.state().cart.total_amount().is_zero());
    }

    #[tokio::test]
    async fn test_checkout() {
        let storage = MemoryStorage::new();
        let store = open(&storage).await;
        assert!(store.checkout().is_none());

        store.add_to_cart(product(1, 1000));
        store.add_to_cart(product(2, 550));
        let receipt = store.checkout().unwrap();

        assert_eq!(receipt.item_count, 2);
        assert_eq!(receipt.total_amount.to_decimal_string(), "15.50");
        assert!(store.state().cart.is_empty());

        store.flush().await;
        let reopened = open(&storage).await;
        assert!(reopened.state().cart.is_empty());
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_then_logout() {
        let store = open(&MemoryStorage::new()).await;

        let user = store.login(&creds("johnd", "m38rmF$")).await.unwrap();
        assert_eq!(user.username, "johnd");

        let state = store.state();
        assert!(state.auth.is_authenticated);
        assert_eq!(state.auth.token.as_deref(), Some("T"));
        assert_eq!(state.auth.request_status, RequestStatus::Idle);

        store.logout();
        let state = store.state();
        assert!(!state.auth.is_authenticated);
        assert!(state.auth.token.is_none());
        assert!(state.auth.user.is_none());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let store = open(&MemoryStorage::new()).await;

        let err = store.login(&creds("johnd", "nope")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);

        let state = store.state();
        assert!(!state.auth.is_authenticated);
        assert_eq!(state.auth.request_status, RequestStatus::Rejected);
        assert_eq!(
            state.auth.last_error.as_ref().unwrap().message,
            "username or password is incorrect"
        );
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_fetch_all_and_by_id() {
        let store = open(&MemoryStorage::new()).await;

        let products = store.fetch_all_products().await.unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(store.state().catalog.items, catalog());

        store.fetch_product_by_id(ProductId(2)).await.unwrap();
        assert_eq!(store.state().catalog.selected_product, Some(product(2, 550)));

        let err = store.fetch_product_by_id(ProductId(99)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let state = store.state();
        assert_eq!(state.catalog.selected_product, Some(product(2, 550)));
        assert_eq!(state.catalog.request_status, RequestStatus::Rejected);

        store.clear_selected_product();
        assert!(store.state().catalog.selected_product.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_all_timeout_keeps_items() {
        let api = Arc::new(FakeApi::with_products(catalog()));
        let store = open_with(api.clone(), Arc::new(MemoryStorage::new())).await;
        store.fetch_all_products().await.unwrap();

        api.set_delay(Duration::from_secs(60));
        let err = store.fetch_all_products().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Timeout);
        let state = store.state();
        assert_eq!(state.catalog.request_status, RequestStatus::Rejected);
        assert_eq!(state.catalog.items.len(), 2);
        assert!(!state.catalog.last_error.as_ref().unwrap().message.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_second_timeout_message() {
        let api = Arc::new(FakeApi::with_products(catalog()));
        api.set_delay(Duration::from_secs(5));
        let options = StoreOptions {
            request_timeout: Duration::from_millis(250),
            ..StoreOptions::default()
        };
        let store = Store::open(api, Arc::new(MemoryStorage::new()), options)
            .await
            .unwrap();

        let err = store.fetch_all_products().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.message, "Request timed out after 1 seconds");
    }

    #[tokio::test]
    async fn test_server_error_is_recorded() {
        let api = Arc::new(FakeApi::with_products(catalog()));
        api.fail_list.store(true, Ordering::SeqCst);
        let store = open_with(api, Arc::new(MemoryStorage::new())).await;

        let err = store.fetch_all_products().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::HttpStatus(503));
        assert!(store.state().catalog.items.is_empty());
    }

    #[tokio::test]
    async fn test_pending_published_before_terminal() {
        let api = Arc::new(FakeApi::default());
        let reply = api.script();
        let store = open_with(api, Arc::new(MemoryStorage::new())).await;
        let mut updates = store.subscribe();

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_all_products().await }
        });
        wait_for_list_dispatch(&store, 1).await;

        updates.changed().await.unwrap();
        assert!(updates.borrow_and_update().catalog.request_status.is_pending());

        // Cart actions are not blocked by the pending request.
        store.add_to_cart(product(1, 1000));
        assert_eq!(store.state().cart.total_item_count(), 1);

        reply.send(Ok(vec![product(7, 700)])).unwrap();
        task.await.unwrap().unwrap();

        let state = store.state();
        assert_eq!(state.catalog.request_status, RequestStatus::Idle);
        assert_eq!(state.catalog.items, vec![product(7, 700)]);
    }

    async fn race_two_list_requests(policy: StaleResponsePolicy) -> Vec<Product> {
        let api = Arc::new(FakeApi::default());
        let first_reply = api.script();
        let second_reply = api.script();
        let options = StoreOptions {
            stale_responses: policy,
            ..StoreOptions::default()
        };
        let store = Store::open(api, Arc::new(MemoryStorage::new()), options)
            .await
            .unwrap();

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_all_products().await }
        });
        wait_for_list_dispatch(&store, 1).await;
        let second = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_all_products().await }
        });
        wait_for_list_dispatch(&store, 2).await;

        // The newer request resolves first, the older one last.
        second_reply.send(Ok(vec![product(2, 200)])).unwrap();
        second.await.unwrap().unwrap();
        first_reply.send(Ok(vec![product(1, 100)])).unwrap();
        first.await.unwrap().unwrap();

        store.state().catalog.items.clone()
    }

    #[tokio::test]
    async fn test_stale_response_dropped_by_default() {
        let items = race_two_list_requests(StaleResponsePolicy::LatestDispatchedWins).await;
        assert_eq!(items, vec![product(2, 200)]);
    }

    #[tokio::test]
    async fn test_last_resolved_wins_applies_stale_response() {
        let items = race_two_list_requests(StaleResponsePolicy::LastResolvedWins).await;
        assert_eq!(items, vec![product(1, 100)]);
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_persist_and_rehydrate_round_trip() {
        let storage = MemoryStorage::new();
        let store = open(&storage).await;

        store.login(&creds("johnd", "m38rmF$")).await.unwrap();
        store.add_to_cart(product(1, 1099));
        store.add_to_cart(product(2, 550));
        store.add_to_cart(product(1, 1099));
        store.fetch_all_products().await.unwrap();
        store.flush().await;
        let before = store.state();

        let reopened = open(&storage).await;
        let after = reopened.state();

        assert_eq!(after.cart, before.cart);
        assert_eq!(after.auth.token, before.auth.token);
        assert_eq!(after.auth.user, before.auth.user);
        assert!(after.auth.is_authenticated);
        // Catalog is never persisted.
        assert!(after.catalog.items.is_empty());
        assert_eq!(storage.len().await, 2);
    }

    #[tokio::test]
    async fn test_catalog_changes_are_not_written() {
        let storage = MemoryStorage::new();
        let store = open(&storage).await;

        store.fetch_all_products().await.unwrap();
        store.flush().await;
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_writes_suppressed_until_rehydrated() {
        let storage = MemoryStorage::new();
        {
            let store = open(&storage).await;
            store.add_to_cart(product(1, 1000));
            store.flush().await;
        }
        let stored = storage.get("persist:cart").await.unwrap();

        let api: Arc<dyn CatalogApi> = Arc::new(FakeApi::default());
        let store = StoreBuilder::new(api)
            .with_storage(Arc::new(storage.clone()))
            .build()
            .unwrap();
        assert!(!store.is_ready());

        store.add_to_cart(product(2, 550));
        store.flush().await;
        assert_eq!(storage.get("persist:cart").await.unwrap(), stored);

        store.rehydrate().await;
        assert!(store.is_ready());
        let cart = &store.state().cart;
        assert_eq!(cart.line_items().len(), 1);
        assert_eq!(cart.line_items()[0].product.id, ProductId(1));
    }

    #[tokio::test]
    async fn test_wait_until_ready() {
        let api: Arc<dyn CatalogApi> = Arc::new(FakeApi::default());
        let store = StoreBuilder::new(api)
            .with_storage(Arc::new(MemoryStorage::new()))
            .build()
            .unwrap();

        let waiter = tokio::spawn({
            let store = store.clone();
            async move { store.wait_until_ready().await }
        });
        store.rehydrate().await;
        waiter.await.unwrap();
        assert!(*store.ready().borrow());
    }

    #[tokio::test]
    async fn test_unsupported_snapshot_discarded() {
        let storage = MemoryStorage::new();
        storage
            .set(
                "persist:cart",
                r#"{"version":99,"saved_at":"2030-01-01T00:00:00Z","state":{}}"#,
            )
            .await
            .unwrap();
        storage.set("persist:auth", "{ corrupted").await.unwrap();

        let store = open(&storage).await;
        assert!(store.is_ready());
        assert!(store.state().cart.is_empty());
        assert!(!store.state().auth.is_authenticated);

        // The next write replaces the discarded snapshot.
        store.add_to_cart(product(1, 1000));
        store.flush().await;
        let reopened = open(&storage).await;
        assert_eq!(reopened.state().cart.total_item_count(), 1);
    }

    #[tokio::test]
    async fn test_tampered_cart_snapshot_still_boots() {
        let storage = MemoryStorage::new();
        let tampered = CartSnapshot {
            line_items: vec![
                tote_core::LineItem {
                    product: product(1, 1000),
                    quantity: 5,
                },
                tote_core::LineItem {
                    product: product(1, 1000),
                    quantity: i64::MAX,
                },
            ],
            total_item_count: 5,
            total_amount: Money::from_cents(5000),
        };
        storage
            .set("persist:cart", &persist::encode(&tampered).unwrap())
            .await
            .unwrap();

        let store = open(&storage).await;
        assert!(store.is_ready());

        let cart = &store.state().cart;
        assert_eq!(cart.line_items().len(), 1);
        assert_eq!(cart.total_item_count(), tote_core::MAX_ITEM_QUANTITY);
        assert_eq!(cart.total_amount().cents(), 1000 * tote_core::MAX_ITEM_QUANTITY);
    }

    #[tokio::test]
    async fn test_custom_key_prefix() {
        let storage = MemoryStorage::new();
        let options = StoreOptions {
            key_prefix: "qa".to_string(),
            ..StoreOptions::default()
        };
        let store = Store::open(
            Arc::new(FakeApi::default()),
            Arc::new(storage.clone()),
            options,
        )
        .await
        .unwrap();

        store.add_to_cart(product(1, 1000));
        store.flush().await;
        assert!(storage.get("qa:cart").await.unwrap().is_some());
        assert!(storage.get("persist:cart").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge() {
        let storage = MemoryStorage::new();
        let store = open(&storage).await;
        store.login(&creds("johnd", "m38rmF$")).await.unwrap();
        store.add_to_cart(product(1, 1000));
        store.flush().await;
        assert_eq!(storage.len().await, 2);

        store.purge().await;
        assert!(storage.is_empty().await);
        assert_eq!(store.state().cart.total_item_count(), 1);
    }

    #[tokio::test]
    async fn test_storage_read_failure_degrades_to_memory() {
        let store = open_with(
            Arc::new(FakeApi::with_products(catalog())),
            Arc::new(FailingStorage),
        )
        .await;
        assert!(store.is_ready());

        store.add_to_cart(product(1, 1000));
        store.flush().await;
        store.fetch_all_products().await.unwrap();

        let state = store.state();
        assert_eq!(state.cart.total_item_count(), 1);
        assert!(state.catalog.last_error.is_none());
        assert!(state.auth.last_error.is_none());
    }

    #[tokio::test]
    async fn test_storage_write_failure_is_swallowed() {
        let store = open_with(
            Arc::new(FakeApi::default()),
            Arc::new(ReadOnlyStorage(MemoryStorage::new())),
        )
        .await;

        store.add_to_cart(product(1, 1000));
        store.add_to_cart(product(2, 550));
        store.flush().await;
        assert_eq!(store.state().cart.total_item_count(), 2);
    }

    #[test]
    fn test_build_without_runtime_fails_with_storage() {
        let api: Arc<dyn CatalogApi> = Arc::new(FakeApi::default());
        let result = StoreBuilder::new(api)
            .with_storage(Arc::new(MemoryStorage::new()))
            .build();
        assert!(matches!(result, Err(StoreError::NoRuntime)));
    }

    #[test]
    fn test_memory_only_store_without_runtime() {
        let api: Arc<dyn CatalogApi> = Arc::new(FakeApi::default());
        let store = StoreBuilder::new(api).build().unwrap();
        store.add_to_cart(product(1, 1000));
        assert_eq!(store.state().cart.total_item_count(), 1);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = ToteConfig::default();
        config.api.timeout_secs = 3;
        config.storage.key_prefix = "qa".to_string();
        config.store.stale_responses = StaleResponsePolicy::LastResolvedWins;

        let options = StoreOptions::from(&config);
        assert_eq!(options.request_timeout, Duration::from_secs(3));
        assert_eq!(options.key_prefix, "qa");
        assert_eq!(options.stale_responses, StaleResponsePolicy::LastResolvedWins);
    }
}
