mod common;

use common::{dec, money, TestApp, TEST_LOGO_MAX_BYTES};
use reqwest::multipart;
use serde_json::{json, Value};

fn profile() -> Value {
    json!({
        "company_name": "  Pixel Works  ",
        "company_email": "billing@pixel.test",
        "company_phone": "",
        "bank_name": "First Bank",
        "account_number": "001122",
        "ifsc_code": "FBNK0001",
        "currency": "inr",
        "tax_enabled": true,
        "tax_rate": "18",
        "default_payment_terms": "Net 15"
    })
}

async fn upload(app: &TestApp, name: &str, mime: &str, data: Vec<u8>) -> reqwest::Response {
    let part = multipart::Part::bytes(data)
        .file_name(name.to_string())
        .mime_str(mime)
        .unwrap();
    let form = multipart::Form::new().part("logo", part);
    app.client
        .post(app.url("/api/settings/logo"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn settings_start_with_defaults() {
    let app = TestApp::spawn().await;

    let settings = app.get_json("/api/settings").await;

    assert_eq!(settings["company_name"], "My Company");
    assert_eq!(settings["currency"], "USD");
    assert_eq!(settings["tax_enabled"], true);
    assert_eq!(money(&settings["tax_rate"]), dec("10"));
    assert_eq!(settings["next_invoice_number"], 1);
    assert!(settings["logo_url"].is_null());
}

#[tokio::test]
async fn update_normalizes_and_feeds_new_drafts() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .put(app.url("/api/settings"))
        .json(&profile())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let settings: Value = response.json().await.unwrap();
    assert_eq!(settings["company_name"], "Pixel Works");
    assert_eq!(settings["currency"], "INR");
    assert!(settings["company_phone"].is_null());

    let draft = app.get_json("/api/documents/new").await;
    assert_eq!(draft["currency"], "INR");
    assert_eq!(draft["currency_symbol"], "₹");
    assert_eq!(money(&draft["tax_rate"]), dec("18"));
    assert_eq!(draft["payment_terms"], "Net 15");
}

#[tokio::test]
async fn update_rejects_out_of_range_tax_rate() {
    let app = TestApp::spawn().await;
    let mut body = profile();
    body["tax_rate"] = json!("150");

    let response = app
        .client
        .put(app.url("/api/settings"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn custom_units_follow_the_defaults() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/api/settings/units"))
        .json(&json!({ "name": " Hour " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let duplicate = app
        .client
        .post(app.url("/api/settings/units"))
        .json(&json!({ "name": "hour" }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status().as_u16(), 409);

    let units = app.get_json("/api/units").await;
    assert_eq!(
        units["units"],
        json!(["Item", "Shots", "Sec", "Minute", "Hour"])
    );

    let removed = app
        .client
        .delete(app.url("/api/settings/units/0"))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status().as_u16(), 200);
    let units = app.get_json("/api/units").await;
    assert_eq!(units["units"], json!(["Item", "Shots", "Sec", "Minute"]));

    let missing = app
        .client
        .delete(app.url("/api/settings/units/3"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn logo_upload_is_served_and_shown_on_preview() {
    let app = TestApp::spawn().await;
    let png = vec![0x89, b'P', b'N', b'G', 1, 2, 3, 4];

    let response = upload(&app, "brand.png", "image/png", png.clone()).await;
    assert_eq!(response.status().as_u16(), 200);

    let settings: Value = response.json().await.unwrap();
    let logo_url = settings["logo_url"].as_str().unwrap().to_string();
    assert!(logo_url.ends_with(".png"));

    let file_name = logo_url
        .split("/logos/")
        .nth(1)
        .expect("logo url points under /logos/")
        .to_string();
    let served = app
        .client
        .get(app.url(&format!("/logos/{}", file_name)))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status().as_u16(), 200);
    assert_eq!(served.bytes().await.unwrap().to_vec(), png);

    let created = app.create_document("invoice", "Acme Ltd").await;
    let html = app
        .client
        .get(app.url(&format!(
            "/api/documents/{}/preview",
            created["id"].as_str().unwrap()
        )))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(&file_name));
}

#[tokio::test]
async fn logo_upload_rejects_non_images() {
    let app = TestApp::spawn().await;

    let response = upload(&app, "notes.txt", "text/plain", b"hello".to_vec()).await;

    assert_eq!(response.status().as_u16(), 400);
    let settings = app.get_json("/api/settings").await;
    assert!(settings["logo_url"].is_null());
}

#[tokio::test]
async fn logo_upload_rejects_oversized_files() {
    let app = TestApp::spawn().await;

    let response = upload(
        &app,
        "huge.png",
        "image/png",
        vec![0; TEST_LOGO_MAX_BYTES + 1],
    )
    .await;

    assert_eq!(response.status().as_u16(), 413);
}

#[tokio::test]
async fn removing_the_logo_clears_it() {
    let app = TestApp::spawn().await;
    upload(&app, "brand.png", "image/png", vec![1, 2, 3]).await;

    let response = app
        .client
        .delete(app.url("/api/settings/logo"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let settings: Value = response.json().await.unwrap();
    assert!(settings["logo_url"].is_null());
}
