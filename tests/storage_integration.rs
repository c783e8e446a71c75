/// Integration smoke tests for the borrower graph against a real
/// PostgreSQL database.
///
/// All tests are marked ignored to avoid running against production by
/// accident; set TEST_DATABASE_URL to run them:
///
///   TEST_DATABASE_URL=postgres://... cargo test -- --ignored
use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use credit_risk_api::borrowers::{BorrowerStore, NewBorrower};
use credit_risk_api::db::Database;
use credit_risk_api::models::{CreateDocumentRequest, CreateTransactionRequest, Decision};
use credit_risk_api::regions::RegionService;
use moka::future::Cache;

async fn connect() -> anyhow::Result<Database> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;
    Database::new(&db_url).await
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

fn region_service(db: &Database) -> RegionService {
    RegionService::new(db.pool.clone(), Cache::builder().build(), None)
}

fn new_borrower(first: &str, region_id: Option<i64>) -> NewBorrower {
    NewBorrower {
        first_name: first.to_string(),
        last_name: "Integration".to_string(),
        email: None,
        phone: None,
        loan_amount: Some(1000.0),
        loan_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        decision: Decision::Pending,
        region_id,
        credit_score: None,
        risk_level: None,
        probability_of_default: None,
    }
}

#[tokio::test]
#[ignore]
async fn resolve_or_create_is_idempotent() -> anyhow::Result<()> {
    let db = connect().await?;
    let regions = region_service(&db);

    let name = format!("test-region-{}", unique_suffix());

    let first = regions.resolve_or_create(&name, None, None).await.unwrap();
    let second = regions.resolve_or_create(&name, None, None).await.unwrap();
    assert_eq!(first.region_id, second.region_id);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM regions WHERE region_name = $1")
        .bind(&name)
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(count, 1);

    regions.delete(first.region_id).await.unwrap();
    Ok(())
}

#[tokio::test]
#[ignore]
async fn concurrent_resolution_creates_exactly_one_region() -> anyhow::Result<()> {
    let db = connect().await?;
    let name = format!("test-race-{}", unique_suffix());

    // Fresh cache per task so every caller takes the lookup-then-insert path
    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = db.pool.clone();
        let name = name.clone();
        handles.push(tokio::spawn(async move {
            let regions = RegionService::new(pool, Cache::builder().build(), None);
            regions.resolve_or_create(&name, None, None).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().region_id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1, "concurrent callers saw different regions");

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM regions WHERE region_name = $1")
        .bind(&name)
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(count, 1, "duplicate region rows created under concurrency");

    region_service(&db).delete(ids[0]).await.unwrap();
    Ok(())
}

#[tokio::test]
#[ignore]
async fn caller_coordinates_overwrite_stored_ones() -> anyhow::Result<()> {
    let db = connect().await?;
    let regions = region_service(&db);
    let name = format!("test-coords-{}", unique_suffix());

    let created = regions
        .resolve_or_create(&name, Some(1.0), Some(2.0))
        .await
        .unwrap();
    assert_eq!(created.latitude, Some(1.0));

    // Last-write-wins, no merging
    let updated = regions
        .resolve_or_create(&name, Some(3.5), Some(4.5))
        .await
        .unwrap();
    assert_eq!(updated.region_id, created.region_id);
    assert_eq!(updated.latitude, Some(3.5));
    assert_eq!(updated.longitude, Some(4.5));

    // A lone half of the pair is ignored
    let untouched = regions
        .resolve_or_create(&name, Some(9.9), None)
        .await
        .unwrap();
    assert_eq!(untouched.latitude, Some(3.5));

    regions.delete(created.region_id).await.unwrap();
    Ok(())
}

#[tokio::test]
#[ignore]
async fn deleting_borrower_cascades_transactions_and_documents() -> anyhow::Result<()> {
    let db = connect().await?;
    let store = BorrowerStore::new(db.pool.clone());

    let borrower = store.insert(new_borrower("Cascade", None)).await.unwrap();

    store
        .add_transaction(
            borrower.borrower_id,
            &CreateTransactionRequest {
                transaction_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                amount: 250.0,
                transaction_type: "repayment".to_string(),
            },
        )
        .await
        .unwrap();
    store
        .add_document(
            borrower.borrower_id,
            &CreateDocumentRequest {
                document_name: "id-card.pdf".to_string(),
                document_type: "identity".to_string(),
                upload_date: None,
            },
        )
        .await
        .unwrap();

    let (transactions, documents) = store.delete(borrower.borrower_id).await.unwrap();
    assert_eq!((transactions, documents), (1, 1));

    let (remaining,): (i64,) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM transactions WHERE borrower_id = $1)
              + (SELECT COUNT(*) FROM documents WHERE borrower_id = $1)",
    )
    .bind(borrower.borrower_id)
    .fetch_one(&db.pool)
    .await?;
    assert_eq!(remaining, 0);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn deleting_region_nulls_borrowers_without_deleting_them() -> anyhow::Result<()> {
    let db = connect().await?;
    let regions = region_service(&db);
    let store = BorrowerStore::new(db.pool.clone());

    let name = format!("test-setnull-{}", unique_suffix());
    let region = regions.resolve_or_create(&name, None, None).await.unwrap();

    let borrower = store
        .insert(new_borrower("SetNull", Some(region.region_id)))
        .await
        .unwrap();
    assert_eq!(borrower.region_id, Some(region.region_id));

    let detached = regions.delete(region.region_id).await.unwrap();
    assert_eq!(detached, 1);

    let survivor = store.get(borrower.borrower_id).await.unwrap();
    assert_eq!(survivor.region_id, None);
    assert_eq!(survivor.region_name, None);

    store.delete(borrower.borrower_id).await.unwrap();
    Ok(())
}

#[tokio::test]
#[ignore]
async fn pagination_returns_stable_ordered_slice() -> anyhow::Result<()> {
    let db = connect().await?;
    let store = BorrowerStore::new(db.pool.clone());

    let mut created = Vec::new();
    for i in 0..150 {
        let record = store
            .insert(new_borrower(&format!("Page{}", i), None))
            .await
            .unwrap();
        created.push(record.borrower_id);
    }

    // Out-of-range paging is rejected before querying
    assert!(store.list(None, Some(0)).await.is_err());
    assert!(store.list(None, Some(1001)).await.is_err());
    assert!(store.list(Some(-1), None).await.is_err());

    // The slice is over ascending borrower_id
    let page = store.list(Some(0), Some(100)).await.unwrap();
    assert_eq!(page.len(), 100);
    let ids: Vec<i64> = page.iter().map(|b| b.borrower_id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);

    // Consecutive pages do not overlap
    let next = store.list(Some(100), Some(100)).await.unwrap();
    if let (Some(last), Some(first)) = (ids.last(), next.first().map(|b| b.borrower_id)) {
        assert!(*last < first);
    }

    for id in created {
        store.delete(id).await.unwrap();
    }
    Ok(())
}
