use anyhow::Result;
use tabletop::domain::{OrderBuilder, PaymentMethod};
use tabletop::storage::Repository;
use tempfile::TempDir;
use uuid::Uuid;

async fn test_repository() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;
    Ok((repo, temp_dir))
}

#[tokio::test]
async fn test_order_batch_rolls_back_on_failure() -> Result<()> {
    let (repo, _temp) = test_repository().await?;
    let restaurant_id = Uuid::new_v4();

    let first = OrderBuilder::new(1, PaymentMethod::Cash)
        .with_id("a")
        .build(restaurant_id);
    let clash = OrderBuilder::new(2, PaymentMethod::Card)
        .with_id("a")
        .build(restaurant_id);

    assert!(repo.save_orders(&[first.clone(), clash]).await.is_err());
    assert!(repo.list_orders(restaurant_id, None).await?.is_empty());
    assert!(!repo.order_exists(restaurant_id, "a").await?);

    repo.save_orders(&[first]).await?;
    assert_eq!(repo.list_orders(restaurant_id, None).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_order_ids_are_scoped_per_restaurant() -> Result<()> {
    let (repo, _temp) = test_repository().await?;
    let (one, two) = (Uuid::new_v4(), Uuid::new_v4());

    repo.save_order(&OrderBuilder::new(1, PaymentMethod::Cash).with_id("x").build(one))
        .await?;
    assert!(repo.order_exists(one, "x").await?);
    assert!(!repo.order_exists(two, "x").await?);

    repo.save_order(&OrderBuilder::new(1, PaymentMethod::Cash).with_id("x").build(two))
        .await?;
    assert!(
        repo.save_order(&OrderBuilder::new(1, PaymentMethod::Cash).with_id("x").build(two))
            .await
            .is_err()
    );
    Ok(())
}
