mod common;

use std::time::Duration;

use anyhow::Result;
use common::{SCENARIO_ORDERS, login_as_new_restaurant, test_service};
use futures::StreamExt;
use tabletop::application::{AppError, ChangeEvent, LiveCollection, RowFilter};
use tabletop::domain::{
    ProductRequest, StaffRole, StaffUserRequest, SubCategoryRequest, TableRequest, TableStatus,
};

fn table(number: i64) -> TableRequest {
    TableRequest {
        number,
        seats: 2,
        hall_id: None,
    }
}

#[tokio::test]
async fn test_table_changes_reach_live_list() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;

    let mut events = service.subscribe_tables()?;
    let mut live = LiveCollection::new(service.list_tables().await?);

    let first = service.add_table(table(1)).await?;
    service.add_table(table(2)).await?;
    service
        .update_table_status(first.id, TableStatus::Occupied)
        .await?;
    service.delete_table(first.id).await?;

    let applied = tokio::time::timeout(Duration::from_secs(1), live.follow(&mut events, 4)).await?;
    assert_eq!(applied, 4);
    assert_eq!(live.len(), 1);
    assert_eq!(live.items()[0].number, 2);
    Ok(())
}

#[tokio::test]
async fn test_subscription_is_scoped_to_restaurant() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let mine = login_as_new_restaurant(&service, "Sahil", "sahil").await?;
    let mut events = service.subscribe_orders()?;

    login_as_new_restaurant(&service, "Dəniz", "deniz").await?;
    service
        .import_orders(
            r#"[{"id": "d-1", "table_number": 1, "total": 10,
                 "payment_method": "cash", "completed_at": "2024-01-05T09:00:00Z"}]"#,
        )
        .await?;

    service.login("sahil", common::RESTAURANT_PASSWORD).await?;
    service.import_orders(SCENARIO_ORDERS).await?;

    let event = tokio::time::timeout(Duration::from_secs(1), events.next())
        .await?
        .expect("feed closed");
    assert_eq!(event.kind(), "inserted");
    assert_eq!(event.record().id, "order-a");
    assert_eq!(event.record().restaurant_id, mine.id);
    Ok(())
}

#[tokio::test]
async fn test_admin_sees_all_orders() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.login(common::ADMIN, common::ADMIN_PASSWORD).await?;
    let mut events = service.subscribe_all_orders()?;
    assert!(matches!(
        service.subscribe_orders(),
        Err(AppError::RestaurantRequired)
    ));

    login_as_new_restaurant(&service, "Sahil", "sahil").await?;
    service.import_orders(SCENARIO_ORDERS).await?;

    let ids: Vec<String> = tokio::time::timeout(
        Duration::from_secs(1),
        events.by_ref().take(2).map(|e| e.record().id.clone()).collect(),
    )
    .await?;
    assert_eq!(ids, vec!["order-a", "order-b"]);
    Ok(())
}

#[tokio::test]
async fn test_category_delete_announces_products() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;

    let drinks = service.add_category("Drinks").await?;
    let tea = service
        .add_product(ProductRequest {
            name: "Tea".into(),
            category_id: drinks.id,
            sub_category_id: None,
            price: 150,
            description: None,
            barcode: None,
        })
        .await?;

    let mut products = service.feeds().products.subscribe(RowFilter::All);
    service.delete_category(drinks.id).await?;

    let event = tokio::time::timeout(Duration::from_secs(1), products.next())
        .await?
        .expect("feed closed");
    assert_eq!(event, ChangeEvent::Deleted(tea));
    Ok(())
}

#[tokio::test]
async fn test_sub_category_delete_announces_detached_products() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;

    let drinks = service.add_category("Drinks").await?;
    let hot = service
        .add_sub_category(SubCategoryRequest {
            name: "Hot".into(),
            category_id: drinks.id,
        })
        .await?;
    let tea = service
        .add_product(ProductRequest {
            name: "Tea".into(),
            category_id: drinks.id,
            sub_category_id: Some(hot.id),
            price: 150,
            description: None,
            barcode: None,
        })
        .await?;

    let mut products = service.feeds().products.subscribe(RowFilter::All);
    let mut sub_categories = service.feeds().sub_categories.subscribe(RowFilter::All);
    service.delete_sub_category(hot.id).await?;

    let event = tokio::time::timeout(Duration::from_secs(1), products.next())
        .await?
        .expect("feed closed");
    assert_eq!(event.kind(), "updated");
    assert_eq!(event.record().id, tea.id);
    assert_eq!(event.record().sub_category_id, None);

    let event = tokio::time::timeout(Duration::from_secs(1), sub_categories.next())
        .await?
        .expect("feed closed");
    assert_eq!(event, ChangeEvent::Deleted(hot));
    Ok(())
}

#[tokio::test]
async fn test_branch_delete_announces_detached_staff() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;

    let branch = service
        .add_branch(tabletop::domain::BranchRequest {
            name: "Nizami".into(),
            ..Default::default()
        })
        .await?;
    let user = service
        .add_staff_user(StaffUserRequest {
            username: "aysel".into(),
            full_name: "Aysel Quliyeva".into(),
            password: "1234".into(),
            role: StaffRole::Waiter,
            branch_id: Some(branch.id),
        })
        .await?;

    let mut staff = service.feeds().staff.subscribe(RowFilter::All);
    service.delete_branch(branch.id).await?;

    let event = tokio::time::timeout(Duration::from_secs(1), staff.next())
        .await?
        .expect("feed closed");
    assert_eq!(event.kind(), "updated");
    assert_eq!(event.record().id, user.id);
    assert_eq!(event.record().branch_id, None);
    Ok(())
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;

    let subscription = service.subscribe_tables()?;
    assert_eq!(service.feeds().tables.subscriber_count(), 1);
    subscription.unsubscribe();
    assert_eq!(service.feeds().tables.subscriber_count(), 0);

    service.add_table(table(1)).await?;
    Ok(())
}
