//! Database seeder for Accord development and testing.
//!
//! Opens a demo chart of accounts for two companies and posts an opening
//! balance through the ledger engine. Running it twice is harmless: existing
//! accounts are kept and the opening balance is only posted once.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use accord_core::LedgerEngine;
use accord_core::coordinator::CoordinatorConfig;
use accord_core::ledger::{
    CallerContext, CreateTransactionInput, JournalEntryInput, NewAccount, PostingInput,
};
use accord_core::store::{LedgerStore, StoreError};
use accord_db::{PgLedgerStore, connect};
use accord_shared::AppConfig;
use accord_shared::types::{AccountId, CompanyId, UserId};
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Demo holding company.
const HOLDING_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0001);
/// Demo subsidiary.
const SUBSIDIARY_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0002);
/// User the seed transactions are attributed to.
const SEED_USER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_00ff);

const HOLDING_CASH: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0001_0001);
const HOLDING_EQUITY: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0001_0002);
const HOLDING_REVENUE: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0001_0003);
const HOLDING_EXPENSE: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0001_0004);
const SUBSIDIARY_CASH: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0002_0001);
const SUBSIDIARY_DUE_TO_PARENT: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0002_0002);

const CHART: &[(Uuid, Uuid, &str)] = &[
    (HOLDING_CASH, HOLDING_ID, "Cash"),
    (HOLDING_EQUITY, HOLDING_ID, "Owner's Equity"),
    (HOLDING_REVENUE, HOLDING_ID, "Revenue"),
    (HOLDING_EXPENSE, HOLDING_ID, "Office Expense"),
    (SUBSIDIARY_CASH, SUBSIDIARY_ID, "Cash"),
    (SUBSIDIARY_DUE_TO_PARENT, SUBSIDIARY_ID, "Due to Parent"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accord=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    info!("Connecting to database...");
    let db = connect(&config.database).await?;
    let store = Arc::new(PgLedgerStore::new(db));
    let engine = LedgerEngine::new(Arc::clone(&store), CoordinatorConfig::from(&config.engine));

    info!("Seeding chart of accounts...");
    seed_accounts(store.as_ref()).await?;

    info!("Seeding opening balance...");
    seed_opening_balance(&engine).await?;

    info!("Seeding complete!");
    Ok(())
}

async fn seed_accounts(store: &PgLedgerStore) -> anyhow::Result<()> {
    for &(id, company_id, name) in CHART {
        let id = AccountId::from_uuid(id);
        match store.get_account(id).await {
            Ok(_) => info!(account_id = %id, name, "Account already exists, skipping"),
            Err(StoreError::NotFound(_)) => {
                store
                    .open_account(NewAccount {
                        id,
                        company_id: CompanyId::from_uuid(company_id),
                        name: name.to_string(),
                    })
                    .await?;
                info!(account_id = %id, name, "Account opened");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn seed_opening_balance(engine: &LedgerEngine<PgLedgerStore>) -> anyhow::Result<()> {
    let holding = CompanyId::from_uuid(HOLDING_ID);
    let ctx = CallerContext::new(holding, UserId::from_uuid(SEED_USER_ID));
    let cash = AccountId::from_uuid(HOLDING_CASH);

    if engine.account_balance(&ctx, cash).await?.version > 0 {
        info!("Opening balance already posted, skipping");
        return Ok(());
    }

    let amount = Decimal::new(10_000_000, 2);
    let response = engine
        .create_transaction(
            &ctx,
            CreateTransactionInput {
                company_id: holding,
                group_name: Some("Opening balances".to_string()),
                description: Some("Initial capital".to_string()),
                transactions: vec![JournalEntryInput::new(
                    "Owner contribution",
                    vec![
                        PostingInput::debit(cash, amount, "Capital received"),
                        PostingInput::credit(
                            AccountId::from_uuid(HOLDING_EQUITY),
                            amount,
                            "Owner's equity",
                        ),
                    ],
                )],
                ..Default::default()
            },
        )
        .await?;

    info!(
        transaction_id = %response.atomic_transaction_id,
        total = %response.total_debit,
        "Opening balance posted"
    );
    Ok(())
}
