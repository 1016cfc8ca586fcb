mod common;

use common::{insert_product, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use storefront_api::{
    entities::{Product, UploadedFile},
    errors::ServiceError,
    services::catalog::{CreateProductInput, ImageUpload, UpdateProductInput},
};

fn png_upload(name: &str) -> ImageUpload {
    ImageUpload {
        data: vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        content_type: "image/png".to_string(),
        file_name: format!("{}.png", name),
    }
}

#[tokio::test]
async fn create_product_stores_image_and_row() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let created = catalog
        .create_product(CreateProductInput {
            name: "Keyboard".to_string(),
            description: "Mechanical keyboard".to_string(),
            price: dec!(59.99),
            image: png_upload("keyboard"),
        })
        .await
        .expect("creation should succeed");

    assert!(created.in_stock);
    assert_eq!(created.price, dec!(59.99));
    let image_id = created.image_id.expect("image reference expected");

    // The stored image is readable back through the file service.
    let (bytes, content_type) = app.state.services.files.read(image_id).await.unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(content_type, "image/png");
}

#[tokio::test]
async fn duplicate_name_rejected_before_any_upload() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    catalog
        .create_product(CreateProductInput {
            name: "Mug".to_string(),
            description: "Coffee mug".to_string(),
            price: dec!(7.50),
            image: png_upload("mug"),
        })
        .await
        .unwrap();

    let files_before = UploadedFile::find().count(&*app.state.db).await.unwrap();

    let err = catalog
        .create_product(CreateProductInput {
            name: "Mug".to_string(),
            description: "Another mug".to_string(),
            price: dec!(8.00),
            image: png_upload("mug2"),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::ValidationError { .. }));

    // No second image record was written and only one product row exists.
    let files_after = UploadedFile::find().count(&*app.state.db).await.unwrap();
    assert_eq!(files_before, files_after);
    let products = Product::find().count(&*app.state.db).await.unwrap();
    assert_eq!(products, 1);
}

#[tokio::test]
async fn negative_price_rejected_without_side_effects() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .catalog
        .create_product(CreateProductInput {
            name: "Broken".to_string(),
            description: String::new(),
            price: dec!(-1.00),
            image: png_upload("broken"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError { .. }));

    let files = UploadedFile::find().count(&*app.state.db).await.unwrap();
    assert_eq!(files, 0);
}

#[tokio::test]
async fn update_replaces_fields_and_supersedes_image() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let created = catalog
        .create_product(CreateProductInput {
            name: "Lamp".to_string(),
            description: "Desk lamp".to_string(),
            price: dec!(30.00),
            image: png_upload("lamp"),
        })
        .await
        .unwrap();
    let old_image = created.image_id.unwrap();

    let updated = catalog
        .update_product(
            created.id,
            UpdateProductInput {
                name: Some("Lamp v2".to_string()),
                price: Some(dec!(35.00)),
                image: Some(png_upload("lamp-v2")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Lamp v2");
    assert_eq!(updated.price, dec!(35.00));
    let new_image = updated.image_id.unwrap();
    assert_ne!(new_image, old_image);

    // The superseded image record is gone; the replacement is readable.
    let err = app.state.services.files.read(old_image).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert!(app.state.services.files.read(new_image).await.is_ok());
}

#[tokio::test]
async fn update_unknown_product_fails() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .catalog
        .update_product(
            uuid::Uuid::new_v4(),
            UpdateProductInput {
                name: Some("Ghost".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn toggle_stock_flips_the_flag() {
    let app = TestApp::new().await;
    let product = insert_product(&app, "Chair", dec!(45.00), None).await;
    let catalog = &app.state.services.catalog;

    let toggled = catalog.toggle_stock(product.id).await.unwrap();
    assert!(!toggled.in_stock);

    let toggled = catalog.toggle_stock(product.id).await.unwrap();
    assert!(toggled.in_stock);
}

#[tokio::test]
async fn delete_removes_product_and_image() {
    let app = TestApp::new().await;
    let catalog = &app.state.services.catalog;

    let created = catalog
        .create_product(CreateProductInput {
            name: "Poster".to_string(),
            description: "Wall poster".to_string(),
            price: dec!(12.00),
            image: png_upload("poster"),
        })
        .await
        .unwrap();
    let image_id = created.image_id.unwrap();

    catalog.delete_product(created.id).await.unwrap();

    let err = catalog.get_product(created.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));

    let err = app.state.services.files.read(image_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn empty_stored_file_reads_as_empty_content() {
    let app = TestApp::new().await;

    let record = app
        .state
        .services
        .files
        .store(&[], "image/png", "empty.png")
        .await
        .unwrap();

    let err = app.state.services.files.read(record.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::EmptyContent { .. }));
}

#[tokio::test]
async fn unknown_file_id_reads_as_not_found() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .files
        .read(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}
