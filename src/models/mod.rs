use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership role on a tradebook. Owners may delete; owners and editors may
/// mutate; readers may only fetch. Enforced both by row policies and by
/// explicit predicates in mutating queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Reader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Reader => "reader",
        }
    }

    pub fn can_edit(&self) -> bool {
        matches!(self, Role::Owner | Role::Editor)
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "owner" => Ok(Role::Owner),
            "editor" => Ok(Role::Editor),
            "reader" => Ok(Role::Reader),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equities,
    FixedIncome,
    Commodities,
    Etfs,
    Forex,
    Derivatives,
    Crypto,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equities => "equities",
            AssetClass::FixedIncome => "fixed_income",
            AssetClass::Commodities => "commodities",
            AssetClass::Etfs => "etfs",
            AssetClass::Forex => "forex",
            AssetClass::Derivatives => "derivatives",
            AssetClass::Crypto => "crypto",
        }
    }
}

impl TryFrom<&str> for AssetClass {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "equities" => Ok(AssetClass::Equities),
            "fixed_income" => Ok(AssetClass::FixedIncome),
            "commodities" => Ok(AssetClass::Commodities),
            "etfs" => Ok(AssetClass::Etfs),
            "forex" => Ok(AssetClass::Forex),
            "derivatives" => Ok(AssetClass::Derivatives),
            "crypto" => Ok(AssetClass::Crypto),
            other => Err(format!("unknown asset class: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::Stop => "stop",
            OrderType::StopLimit => "stop_limit",
        }
    }
}

impl TryFrom<&str> for OrderType {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            "stop" => Ok(OrderType::Stop),
            "stop_limit" => Ok(OrderType::StopLimit),
            other => Err(format!("unknown order type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseType {
    Cash,
    Margin,
}

impl PurchaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseType::Cash => "cash",
            PurchaseType::Margin => "margin",
        }
    }
}

impl TryFrom<&str> for PurchaseType {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "cash" => Ok(PurchaseType::Cash),
            "margin" => Ok(PurchaseType::Margin),
            other => Err(format!("unknown purchase type: {other}")),
        }
    }
}

// --- Requests ---

#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTradebookRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct NewTradeRequest {
    pub asset_class: AssetClass,
    pub purchase_type: PurchaseType,
    pub order_type: OrderType,
    pub entry_date: DateTime<Utc>,
    pub symbol: String,
    pub entry_quantity: Decimal,
    pub entry_price: Decimal,
    pub entry_fees: Option<Decimal>,
    #[serde(default)]
    pub exit_legs: Vec<NewExitLegRequest>,
}

#[derive(Debug, Deserialize)]
pub struct NewExitLegRequest {
    pub exit_date: DateTime<Utc>,
    pub exit_quantity: Decimal,
    pub exit_price: Decimal,
    pub exit_fees: Option<Decimal>,
}

/// Partial trade update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTradeRequest {
    pub asset_class: Option<AssetClass>,
    pub purchase_type: Option<PurchaseType>,
    pub order_type: Option<OrderType>,
    pub entry_date: Option<DateTime<Utc>>,
    pub symbol: Option<String>,
    pub entry_quantity: Option<Decimal>,
    pub entry_price: Option<Decimal>,
    pub entry_fees: Option<Decimal>,
}

// --- Responses ---

#[derive(Debug, Serialize)]
pub struct TradebookResponse {
    pub id: Uuid,
    pub title: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TradeResponse {
    pub id: Uuid,
    pub tradebook_id: Uuid,
    pub asset_class: AssetClass,
    pub purchase_type: PurchaseType,
    pub order_type: OrderType,
    pub entry_date: DateTime<Utc>,
    pub symbol: String,
    pub entry_quantity: Decimal,
    pub entry_price: Decimal,
    pub entry_fees: Option<Decimal>,
    pub exit_legs: Vec<ExitLegResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ExitLegResponse {
    pub id: Uuid,
    pub trade_id: Uuid,
    pub exit_date: DateTime<Utc>,
    pub exit_quantity: Decimal,
    pub exit_price: Decimal,
    pub exit_fees: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}
