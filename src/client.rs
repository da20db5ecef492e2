//! Consumer-side cart state container.
//!
//! Mirrors the server cart for the active session: optimistic local
//! updates on user action, reconciled against the Cart Store over HTTP.
//! The transport is a trait so the container's behavior can be exercised
//! without a running server.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cart::{Cart, CartKey};
use crate::dto::cart::{
    AddToCartRequest, AddToCartResponse, RemoveFromCartRequest, RemoveFromCartResponse,
};
use crate::dto::orders::{CreateOrderRequest, CreateOrderResponse};
use crate::dto::products::ProductList;
use crate::models::Product;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("authentication required")]
    AuthenticationRequired,

    /// The server rejected the request; surfaced to the user as a generic
    /// "try again" state. The client never retries automatically.
    #[error("server rejected the request with status {status}")]
    Api { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// What the UI should do after a cart action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    Updated,
    /// Unauthenticated mutation attempts become a navigation side effect
    /// instead of creating anonymous cart state.
    RedirectToLogin,
}

#[allow(async_fn_in_trait)]
pub trait CartTransport {
    async fn fetch_cart(&self, token: &str) -> Result<Cart, ClientError>;
    async fn fetch_products(&self) -> Result<Vec<Product>, ClientError>;
    async fn add_to_cart(&self, token: &str, item_id: i32, size: &str)
    -> Result<Cart, ClientError>;
    async fn remove_from_cart(
        &self,
        token: &str,
        item_id: i32,
        size: &str,
        remove_all: bool,
    ) -> Result<Cart, ClientError>;
    async fn create_order(
        &self,
        token: &str,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ClientError>;
}

pub struct CartClient<T> {
    transport: T,
    token: Option<String>,
    cart: Cart,
    products: Vec<Product>,
}

impl<T: CartTransport> CartClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token: None,
            cart: Cart::new(),
            products: Vec::new(),
        }
    }

    pub fn with_token(transport: T, token: impl Into<String>) -> Self {
        let mut client = Self::new(transport);
        client.token = Some(token.into());
        client
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// One fetch of the server cart replacing local state entirely; the
    /// server wins over any optimistic state from before the fetch. On
    /// failure the local view resets to empty and the error surfaces.
    pub async fn sync(&mut self) -> Result<(), ClientError> {
        let Some(token) = self.token.clone() else {
            self.cart = Cart::new();
            return Ok(());
        };
        match self.transport.fetch_cart(&token).await {
            Ok(cart) => {
                self.cart = cart;
                Ok(())
            }
            Err(err) => {
                self.cart = Cart::new();
                Err(err)
            }
        }
    }

    pub async fn load_products(&mut self) -> Result<(), ClientError> {
        self.products = self.transport.fetch_products().await?;
        Ok(())
    }

    /// Optimistically increment the local key, then confirm with the
    /// server; the server's returned cart replaces the local view. If the
    /// request fails, the authoritative cart is re-fetched rather than
    /// leaving divergent local state.
    pub async fn add_to_cart(
        &mut self,
        product_id: i32,
        size: &str,
    ) -> Result<CartAction, ClientError> {
        let Some(token) = self.token.clone() else {
            return Ok(CartAction::RedirectToLogin);
        };
        let key = CartKey::new(product_id, size);
        self.cart.add(&key);

        match self.transport.add_to_cart(&token, product_id, size).await {
            Ok(server_cart) => {
                self.cart = server_cart;
                Ok(CartAction::Updated)
            }
            Err(err) => {
                self.reconcile(&token).await;
                Err(err)
            }
        }
    }

    /// Mirrors the store's decrement-or-delete rule locally before
    /// confirming with the server.
    pub async fn remove_from_cart(
        &mut self,
        product_id: i32,
        size: &str,
        remove_all: bool,
    ) -> Result<CartAction, ClientError> {
        let Some(token) = self.token.clone() else {
            return Ok(CartAction::RedirectToLogin);
        };
        let key = CartKey::new(product_id, size);
        self.cart.remove(&key, remove_all);

        match self
            .transport
            .remove_from_cart(&token, product_id, size, remove_all)
            .await
        {
            Ok(server_cart) => {
                self.cart = server_cart;
                Ok(CartAction::Updated)
            }
            Err(err) => {
                self.reconcile(&token).await;
                Err(err)
            }
        }
    }

    async fn reconcile(&mut self, token: &str) {
        // A mutation failed mid-flight; the server cart is authoritative.
        // If this fetch fails too the optimistic view stays until the next
        // successful round trip.
        if let Ok(cart) = self.transport.fetch_cart(token).await {
            self.cart = cart;
        }
    }

    /// Sum of all quantities. Unauthenticated state is empty by contract,
    /// so this is 0 without a token even if local state is nonempty from a
    /// prior session.
    pub fn total_cart_items(&self) -> i64 {
        if self.token.is_none() {
            return 0;
        }
        self.cart.total_items()
    }

    /// Displayed total: quantity times the *current* catalog price, looked
    /// up fresh from the in-memory product list. Entries whose product is
    /// missing from the list contribute nothing. The committed price is
    /// only fixed at order creation.
    pub fn total_cart_amount(&self) -> Decimal {
        self.cart
            .lines()
            .filter_map(|(key, qty)| {
                self.products
                    .iter()
                    .find(|p| p.id == key.product_id)
                    .map(|p| p.new_price * Decimal::from(qty))
            })
            .sum()
    }

    /// Submit the full cart snapshot with the displayed total; local state
    /// clears on success (the server clears its copy in the same
    /// transaction that creates the order).
    pub async fn checkout(&mut self, user_id: Uuid) -> Result<CreateOrderResponse, ClientError> {
        let Some(token) = self.token.clone() else {
            return Err(ClientError::AuthenticationRequired);
        };
        let request = CreateOrderRequest {
            user_id,
            cart_items: self.cart.clone(),
            total_amount: self.total_cart_amount(),
        };
        let response = self.transport.create_order(&token, &request).await?;
        self.cart.clear();
        Ok(response)
    }
}

/// HTTP transport against the storefront endpoints.
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn check(response: &reqwest::Response) -> Result<(), ClientError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

impl CartTransport for HttpTransport {
    async fn fetch_cart(&self, token: &str) -> Result<Cart, ClientError> {
        let response = self
            .http
            .post(self.url("/getcart"))
            .bearer_auth(token)
            .send()
            .await?;
        Self::check(&response)?;
        Ok(response.json::<Cart>().await?)
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, ClientError> {
        let response = self
            .http
            .get(self.url("/api/products?per_page=100"))
            .send()
            .await?;
        Self::check(&response)?;
        let envelope = response.json::<Envelope<ProductList>>().await?;
        Ok(envelope.data.map(|list| list.items).unwrap_or_default())
    }

    async fn add_to_cart(
        &self,
        token: &str,
        item_id: i32,
        size: &str,
    ) -> Result<Cart, ClientError> {
        let response = self
            .http
            .post(self.url("/addtocart"))
            .bearer_auth(token)
            .json(&AddToCartRequest {
                item_id,
                size: size.to_string(),
            })
            .send()
            .await?;
        Self::check(&response)?;
        Ok(response.json::<AddToCartResponse>().await?.cart_data)
    }

    async fn remove_from_cart(
        &self,
        token: &str,
        item_id: i32,
        size: &str,
        remove_all: bool,
    ) -> Result<Cart, ClientError> {
        let response = self
            .http
            .post(self.url("/removefromcart"))
            .bearer_auth(token)
            .json(&RemoveFromCartRequest {
                item_id,
                size: size.to_string(),
                remove_all,
            })
            .send()
            .await?;
        Self::check(&response)?;
        Ok(response.json::<RemoveFromCartResponse>().await?.cart_data)
    }

    async fn create_order(
        &self,
        token: &str,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/api/orders/create"))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        Self::check(&response)?;
        Ok(response.json::<CreateOrderResponse>().await?)
    }
}
