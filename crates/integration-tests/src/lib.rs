//! In-process mock of the Sweet Shop REST service.
//!
//! Implements the wire contract the client depends on - auth endpoints with
//! JWT issuance, sweets CRUD, purchase/restock - plus the knobs the tests
//! need: expired access tokens, refusing refreshes, `{data: T}` envelopes,
//! and a refresh-call counter for single-flight assertions.
//!
//! Tokens are structurally valid JWTs with an unverified signature; the
//! client only reads claims, so that is all the contract requires.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Mutex;

use sweet_shop_client::{ApiClient, ClientConfig, Inventory, MemoryStore, SessionManager};
use sweet_shop_core::{Role, Sweet, SweetId};

/// A registered account on the mock server.
#[derive(Clone)]
struct UserRecord {
    name: String,
    password: String,
    role: Role,
}

/// Shared mutable state of the mock shop.
pub struct ShopState {
    sweets: Mutex<Vec<Sweet>>,
    users: Mutex<HashMap<String, UserRecord>>,
    next_id: AtomicU64,
    token_serial: AtomicU64,
    // Lifetime (seconds, may be negative) of access tokens minted at login.
    login_token_ttl: AtomicI64,
    // Lifetime of access tokens minted by /auth/refresh.
    refresh_grant_ttl: AtomicI64,
    // When false, /auth/refresh answers 401.
    accept_refresh: AtomicBool,
    // Number of /auth/refresh calls observed.
    refresh_calls: AtomicUsize,
    // The refresh token most recently issued at login.
    current_refresh: Mutex<Option<String>>,
    // When true, JSON success bodies are wrapped in {"data": ...}.
    enveloped: AtomicBool,
}

impl ShopState {
    fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(
            "admin@shop.test".to_string(),
            UserRecord {
                name: "Admin".to_string(),
                password: "password123".to_string(),
                role: Role::Admin,
            },
        );
        users.insert(
            "customer@shop.test".to_string(),
            UserRecord {
                name: "Customer".to_string(),
                password: "password123".to_string(),
                role: Role::User,
            },
        );

        Self {
            sweets: Mutex::new(Vec::new()),
            users: Mutex::new(users),
            next_id: AtomicU64::new(1),
            token_serial: AtomicU64::new(0),
            login_token_ttl: AtomicI64::new(3600),
            refresh_grant_ttl: AtomicI64::new(3600),
            accept_refresh: AtomicBool::new(true),
            refresh_calls: AtomicUsize::new(0),
            current_refresh: Mutex::new(None),
            enveloped: AtomicBool::new(false),
        }
    }

    fn mint_access_token(&self, email: &str, ttl: i64) -> String {
        let user = self.users.lock().expect("users lock");
        let record = user.get(email).expect("minting token for unknown user");
        let now = chrono::Utc::now().timestamp();
        // Serial makes every token unique even within one second.
        let serial = self.token_serial.fetch_add(1, Ordering::SeqCst);
        let payload = json!({
            "sub": email,
            "name": record.name,
            "role": record.role,
            "exp": now + ttl,
            "iat": now,
            "jti": serial,
        });
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.unsigned")
    }
}

/// Handle to a running mock shop.
pub struct MockShop {
    /// Address the server is listening on.
    pub addr: SocketAddr,
    /// Shared state, for seeding and assertions.
    pub state: Arc<ShopState>,
}

impl MockShop {
    /// Start a mock shop on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics when the listener cannot be bound (test environment problem).
    pub async fn spawn() -> Self {
        let state = Arc::new(ShopState::new());

        let router = Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/sweets", get(list_sweets).post(create_sweet))
            .route("/sweets/search", get(search_sweets))
            .route(
                "/sweets/{id}",
                get(get_sweet).put(update_sweet).delete(delete_sweet),
            )
            .route("/sweets/{id}/purchase", post(purchase_sweet))
            .route("/sweets/{id}/restock", post(restock_sweet))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock shop");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self { addr, state }
    }

    /// Base URL of the running server.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this server.
    ///
    /// # Panics
    ///
    /// Panics when the bound address does not form a valid URL.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url()).expect("mock shop base url")
    }

    /// Assemble the full SDK stack against this server, with an in-memory
    /// credential store shared for assertions.
    ///
    /// # Panics
    ///
    /// Panics when the SDK cannot be constructed (test environment problem).
    #[must_use]
    pub fn sdk(&self) -> Sdk {
        let store = Arc::new(MemoryStore::new());
        let config = self.config();
        let session =
            SessionManager::new(&config, Arc::<MemoryStore>::clone(&store)).expect("session");
        let gateway = ApiClient::new(&config, session.clone()).expect("gateway");
        let inventory = Inventory::new(gateway.clone());
        Sdk {
            session,
            gateway,
            inventory,
            store,
        }
    }

    /// Seed a sweet directly into server state, returning its id.
    ///
    /// # Panics
    ///
    /// Panics when the price literal cannot be represented.
    pub fn seed_sweet(&self, name: &str, category: &str, price: &str, quantity: u32) -> SweetId {
        let id = SweetId::new(
            self.state
                .next_id
                .fetch_add(1, Ordering::SeqCst)
                .to_string(),
        );
        let sweet = Sweet {
            id: id.clone(),
            name: name.to_string(),
            category: category.to_string(),
            price: price.parse::<Decimal>().expect("seed price"),
            quantity,
            description: None,
        };
        self.state.sweets.lock().expect("sweets lock").push(sweet);
        id
    }

    /// Server-side quantity for a sweet, for reconciliation assertions.
    #[must_use]
    pub fn quantity_of(&self, id: &SweetId) -> Option<u32> {
        self.state
            .sweets
            .lock()
            .expect("sweets lock")
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.quantity)
    }

    /// Lifetime of access tokens minted at login (negative = pre-expired).
    pub fn set_login_token_ttl(&self, secs: i64) {
        self.state.login_token_ttl.store(secs, Ordering::SeqCst);
    }

    /// Lifetime of access tokens minted by refresh.
    pub fn set_refresh_grant_ttl(&self, secs: i64) {
        self.state.refresh_grant_ttl.store(secs, Ordering::SeqCst);
    }

    /// Whether `/auth/refresh` accepts the stored refresh token.
    pub fn set_accept_refresh(&self, accept: bool) {
        self.state.accept_refresh.store(accept, Ordering::SeqCst);
    }

    /// Wrap success bodies in a `{"data": ...}` envelope.
    pub fn set_enveloped(&self, enveloped: bool) {
        self.state.enveloped.store(enveloped, Ordering::SeqCst);
    }

    /// How many refresh calls the server has seen.
    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }
}

/// Fully wired SDK stack for one test.
pub struct Sdk {
    /// Session manager under test.
    pub session: SessionManager,
    /// Gateway client under test.
    pub gateway: ApiClient,
    /// Inventory cache under test.
    pub inventory: Inventory,
    /// The credential store backing the session, for direct assertions.
    pub store: Arc<MemoryStore>,
}

// =============================================================================
// Handlers
// =============================================================================

type ErrorBody = (StatusCode, axum::Json<Value>);

fn fail(status: StatusCode, message: &str) -> ErrorBody {
    (status, axum::Json(json!({ "message": message })))
}

fn success(state: &ShopState, value: Value) -> axum::Json<Value> {
    if state.enveloped.load(Ordering::SeqCst) {
        axum::Json(json!({ "data": value, "success": true }))
    } else {
        axum::Json(value)
    }
}

struct AuthedUser {
    #[allow(dead_code)]
    email: String,
    role: Role,
}

fn authorize(headers: &HeaderMap) -> Result<AuthedUser, ErrorBody> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Missing bearer token"))?;

    let claims = sweet_shop_client::token::decode_claims(token)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Malformed token"))?;

    if claims.exp <= chrono::Utc::now().timestamp() {
        return Err(fail(StatusCode::UNAUTHORIZED, "Token expired"));
    }

    Ok(AuthedUser {
        email: claims.sub,
        role: claims.role,
    })
}

fn require_admin(user: &AuthedUser) -> Result<(), ErrorBody> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(fail(StatusCode::FORBIDDEN, "Admin role required"))
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<Arc<ShopState>>,
    axum::Json(request): axum::Json<RegisterRequest>,
) -> Result<Response, ErrorBody> {
    let mut users = state.users.lock().expect("users lock");
    if users.contains_key(&request.email) {
        return Err(fail(StatusCode::CONFLICT, "Email already registered"));
    }
    users.insert(
        request.email,
        UserRecord {
            name: request.name,
            password: request.password,
            role: Role::User,
        },
    );
    Ok((StatusCode::CREATED, "User registered successfully").into_response())
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<Arc<ShopState>>,
    axum::Json(request): axum::Json<LoginRequest>,
) -> Result<Response, ErrorBody> {
    let valid = state
        .users
        .lock()
        .expect("users lock")
        .get(&request.email)
        .is_some_and(|u| u.password == request.password);
    if !valid {
        return Err(fail(StatusCode::UNAUTHORIZED, "Invalid credentials"));
    }

    let ttl = state.login_token_ttl.load(Ordering::SeqCst);
    let access_token = state.mint_access_token(&request.email, ttl);
    let refresh_token = format!(
        "refresh-{}",
        state.token_serial.fetch_add(1, Ordering::SeqCst)
    );
    *state.current_refresh.lock().expect("refresh lock") =
        Some(format!("{}:{}", request.email, refresh_token));

    Ok(success(
        &state,
        json!({
            "accessToken": access_token,
            "refreshToken": format!("{}:{}", request.email, refresh_token),
        }),
    )
    .into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

async fn refresh(
    State(state): State<Arc<ShopState>>,
    axum::Json(request): axum::Json<RefreshRequest>,
) -> Result<Response, ErrorBody> {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    if !state.accept_refresh.load(Ordering::SeqCst) {
        return Err(fail(StatusCode::UNAUTHORIZED, "Refresh token revoked"));
    }

    let stored = state.current_refresh.lock().expect("refresh lock").clone();
    if stored.as_deref() != Some(request.refresh_token.as_str()) {
        return Err(fail(StatusCode::UNAUTHORIZED, "Unknown refresh token"));
    }

    // Refresh tokens are issued as "email:serial".
    let email = request
        .refresh_token
        .split(':')
        .next()
        .unwrap_or_default()
        .to_string();
    let ttl = state.refresh_grant_ttl.load(Ordering::SeqCst);
    let access_token = state.mint_access_token(&email, ttl);

    Ok(success(&state, json!({ "accessToken": access_token })).into_response())
}

async fn list_sweets(
    State(state): State<Arc<ShopState>>,
    headers: HeaderMap,
) -> Result<Response, ErrorBody> {
    authorize(&headers)?;
    let sweets = state.sweets.lock().expect("sweets lock").clone();
    Ok(success(&state, serde_json::to_value(sweets).expect("serialize")).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    name: Option<String>,
    category: Option<String>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
}

async fn search_sweets(
    State(state): State<Arc<ShopState>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Response, ErrorBody> {
    authorize(&headers)?;
    let sweets: Vec<Sweet> = state
        .sweets
        .lock()
        .expect("sweets lock")
        .iter()
        .filter(|s| {
            params
                .name
                .as_ref()
                .is_none_or(|n| s.name.to_lowercase().contains(&n.to_lowercase()))
                && params.category.as_ref().is_none_or(|c| &s.category == c)
                && params.min_price.is_none_or(|min| s.price >= min)
                && params.max_price.is_none_or(|max| s.price <= max)
        })
        .cloned()
        .collect();
    Ok(success(&state, serde_json::to_value(sweets).expect("serialize")).into_response())
}

async fn get_sweet(
    State(state): State<Arc<ShopState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ErrorBody> {
    authorize(&headers)?;
    let id = SweetId::new(id);
    let sweet = state
        .sweets
        .lock()
        .expect("sweets lock")
        .iter()
        .find(|s| s.id == id)
        .cloned()
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Sweet not found"))?;
    Ok(success(&state, serde_json::to_value(sweet).expect("serialize")).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SweetBody {
    name: String,
    category: String,
    price: Decimal,
    quantity: u32,
    #[serde(default)]
    description: Option<String>,
}

async fn create_sweet(
    State(state): State<Arc<ShopState>>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<SweetBody>,
) -> Result<Response, ErrorBody> {
    let user = authorize(&headers)?;
    require_admin(&user)?;

    let sweet = Sweet {
        id: SweetId::new(state.next_id.fetch_add(1, Ordering::SeqCst).to_string()),
        name: body.name,
        category: body.category,
        price: body.price,
        quantity: body.quantity,
        description: body.description,
    };
    state
        .sweets
        .lock()
        .expect("sweets lock")
        .push(sweet.clone());
    Ok((
        StatusCode::CREATED,
        success(&state, serde_json::to_value(sweet).expect("serialize")),
    )
        .into_response())
}

async fn update_sweet(
    State(state): State<Arc<ShopState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<SweetBody>,
) -> Result<Response, ErrorBody> {
    let user = authorize(&headers)?;
    require_admin(&user)?;

    let id = SweetId::new(id);
    let mut sweets = state.sweets.lock().expect("sweets lock");
    let sweet = sweets
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Sweet not found"))?;
    sweet.name = body.name;
    sweet.category = body.category;
    sweet.price = body.price;
    sweet.quantity = body.quantity;
    sweet.description = body.description;
    let updated = sweet.clone();
    drop(sweets);
    Ok(success(&state, serde_json::to_value(updated).expect("serialize")).into_response())
}

async fn delete_sweet(
    State(state): State<Arc<ShopState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ErrorBody> {
    let user = authorize(&headers)?;
    require_admin(&user)?;

    let id = SweetId::new(id);
    let mut sweets = state.sweets.lock().expect("sweets lock");
    let before = sweets.len();
    sweets.retain(|s| s.id != id);
    if sweets.len() == before {
        return Err(fail(StatusCode::NOT_FOUND, "Sweet not found"));
    }
    Ok("Sweet deleted successfully".into_response())
}

#[derive(Deserialize)]
struct QuantityBody {
    quantity: u32,
}

async fn purchase_sweet(
    State(state): State<Arc<ShopState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<QuantityBody>,
) -> Result<Response, ErrorBody> {
    authorize(&headers)?;

    let id = SweetId::new(id);
    let mut sweets = state.sweets.lock().expect("sweets lock");
    let sweet = sweets
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Sweet not found"))?;
    if body.quantity > sweet.quantity {
        return Err(fail(StatusCode::BAD_REQUEST, "Insufficient stock"));
    }
    sweet.quantity -= body.quantity;
    Ok("Sweet purchased successfully".into_response())
}

async fn restock_sweet(
    State(state): State<Arc<ShopState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<QuantityBody>,
) -> Result<Response, ErrorBody> {
    let user = authorize(&headers)?;
    require_admin(&user)?;

    let id = SweetId::new(id);
    let mut sweets = state.sweets.lock().expect("sweets lock");
    let sweet = sweets
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Sweet not found"))?;
    sweet.quantity += body.quantity;
    Ok("Sweet restocked successfully".into_response())
}
