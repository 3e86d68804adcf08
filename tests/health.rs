use shop_api::routes::health::health_check;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert!(response.0.success);
    assert_eq!(response.0.message, "Health check");

    let body = serde_json::to_value(&response.0).expect("serializable");
    assert_eq!(body["result"]["status"], "ok");
    assert!(body.get("meta").is_none());
}
