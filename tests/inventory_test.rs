mod common;

use std::time::Duration;

use anyhow::Result;
use common::{login_as_new_restaurant, test_service};
use tabletop::application::AppError;
use tabletop::domain::{IngredientRequest, RecipeLine, SemiFinishedRequest, Unit};

fn ingredient(name: &str, quantity: f64, min_quantity: f64) -> IngredientRequest {
    IngredientRequest {
        name: name.into(),
        unit: Unit::Kg,
        quantity,
        min_quantity,
        is_active: true,
    }
}

fn dough(lines: Vec<RecipeLine>) -> SemiFinishedRequest {
    SemiFinishedRequest {
        name: "Xəmir".into(),
        unit: Unit::Kg,
        quantity: 2.0,
        min_quantity: 1.0,
        ingredients: lines,
        is_active: true,
    }
}

#[tokio::test]
async fn test_ingredient_lifecycle() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;

    let flour = service.add_ingredient(ingredient("Un", 10.0, 2.0)).await?;
    service.add_ingredient(ingredient("Duz", 0.5, 1.0)).await?;

    let result = service.add_ingredient(ingredient("Yağ", -1.0, 0.0)).await;
    assert!(matches!(result, Err(AppError::Validation(ref e)) if e.field == "quantity"));

    let names: Vec<String> = service
        .list_ingredients()
        .await?
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, vec!["Duz", "Un"]);

    let updated = service
        .update_ingredient(
            flour.id,
            IngredientRequest {
                unit: Unit::G,
                ..ingredient("Un", 1500.0, 2000.0)
            },
        )
        .await?;
    assert_eq!(updated.unit, Unit::G);
    assert_eq!(updated.quantity, 1500.0);

    service.delete_ingredient(flour.id).await?;
    assert!(matches!(
        service.delete_ingredient(flour.id).await,
        Err(AppError::IngredientNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_low_stock_lists_only_active_items() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;

    service.add_ingredient(ingredient("Un", 10.0, 2.0)).await?;
    service.add_ingredient(ingredient("Süd", 2.0, 2.0)).await?;
    service
        .add_ingredient(IngredientRequest {
            is_active: false,
            ..ingredient("Köhnə", 0.0, 1.0)
        })
        .await?;

    let low: Vec<String> = service
        .low_stock_ingredients()
        .await?
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(low, vec!["Süd"]);
    Ok(())
}

#[tokio::test]
async fn test_semi_finished_recipe_guards() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;
    let flour = service.add_ingredient(ingredient("Un", 10.0, 2.0)).await?;
    let water = service.add_ingredient(ingredient("Su", 5.0, 0.0)).await?;

    let item = service
        .add_semi_finished(dough(vec![
            RecipeLine {
                ingredient_id: flour.id,
                quantity: 0.7,
            },
            RecipeLine {
                ingredient_id: water.id,
                quantity: 0.3,
            },
        ]))
        .await?;
    assert_eq!(item.ingredients.len(), 2);
    assert_eq!(service.list_semi_finished().await?[0], item);

    // An ingredient still in a recipe cannot be removed.
    let result = service.delete_ingredient(flour.id).await;
    assert!(matches!(result, Err(AppError::IngredientInUse(ref name)) if name == "Xəmir"));

    let updated = service
        .update_semi_finished(
            item.id,
            dough(vec![RecipeLine {
                ingredient_id: water.id,
                quantity: 1.0,
            }]),
        )
        .await?;
    assert!(!updated.uses(flour.id));
    service.delete_ingredient(flour.id).await?;

    let result = service.add_semi_finished(dough(Vec::new())).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    service.delete_semi_finished(item.id).await?;
    assert!(service.list_semi_finished().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_recipe_cannot_use_another_restaurants_ingredient() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;
    let foreign = service.add_ingredient(ingredient("Un", 10.0, 2.0)).await?;

    login_as_new_restaurant(&service, "Dəniz", "deniz").await?;
    assert!(service.list_ingredients().await?.is_empty());

    let result = service
        .add_semi_finished(dough(vec![RecipeLine {
            ingredient_id: foreign.id,
            quantity: 1.0,
        }]))
        .await;
    assert!(matches!(result, Err(AppError::IngredientNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_warehouses_newest_first_and_toggle() -> Result<()> {
    let (service, _temp) = test_service().await?;
    login_as_new_restaurant(&service, "Sahil", "sahil").await?;

    let main = service.add_warehouse("Main").await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let cold = service.add_warehouse("Cold room").await?;
    assert!(main.is_active);

    let warehouses = service.list_warehouses().await?;
    assert_eq!(warehouses[0].id, cold.id);
    assert_eq!(warehouses[1].id, main.id);

    let off = service.set_warehouse_active(main.id, false).await?;
    assert!(!off.is_active);
    let stored = service.list_warehouses().await?;
    assert!(!stored[1].is_active);

    assert!(matches!(
        service.add_warehouse("  ").await,
        Err(AppError::Validation(_))
    ));

    service.delete_warehouse(cold.id).await?;
    assert!(matches!(
        service.set_warehouse_active(cold.id, true).await,
        Err(AppError::WarehouseNotFound(_))
    ));
    Ok(())
}
