use std::sync::Arc;

use crate::helpers::{
    FailingCheck, FlakyCheck, UnhealthyCheck, spawn_app, spawn_app_with_check,
    spawn_patient_app_with_check,
};

#[tokio::test]
async fn health_check_returns_204_with_an_empty_body() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get_health_check().await;

    // Assert
    assert_eq!(204, response.status().as_u16());
    assert!(response.bytes().await.expect("Failed to read body").is_empty());
}

#[tokio::test]
async fn health_check_accepts_any_method() {
    // Arrange
    let app = spawn_app().await;
    let methods = vec![
        reqwest::Method::GET,
        reqwest::Method::POST,
        reqwest::Method::PUT,
        reqwest::Method::DELETE,
        reqwest::Method::PATCH,
    ];

    for method in methods {
        // Act
        let response = app.request_health_check(method.clone()).await;

        // Assert
        assert_eq!(
            204,
            response.status().as_u16(),
            "The API did not return 204 No Content for a {} request",
            method
        );
    }
}

#[tokio::test]
async fn health_check_returns_500_when_the_check_keeps_failing() {
    // Arrange
    let app = spawn_app_with_check(Arc::new(FailingCheck)).await;

    // Act
    let response = app.get_health_check().await;

    // Assert
    assert_eq!(500, response.status().as_u16());
    assert!(response.bytes().await.expect("Failed to read body").is_empty());
}

#[tokio::test]
async fn health_check_returns_500_when_the_service_reports_unhealthy() {
    // Arrange
    let app = spawn_app_with_check(Arc::new(UnhealthyCheck)).await;

    // Act
    let response = app.get_health_check().await;

    // Assert
    assert_eq!(500, response.status().as_u16());
}

#[tokio::test]
async fn health_check_succeeds_once_a_failed_delivery_is_retried() {
    // Arrange
    let app = spawn_patient_app_with_check(Arc::new(FlakyCheck)).await;

    // Act
    let response = app.get_health_check().await;

    // Assert
    assert_eq!(204, response.status().as_u16());
}

#[tokio::test]
async fn concurrent_health_checks_are_answered_independently() {
    // Arrange
    let app = Arc::new(spawn_app().await);

    // Act
    let handles: Vec<_> = (0..20)
        .map(|_| {
            let app = Arc::clone(&app);
            tokio::spawn(async move { app.get_health_check().await.status().as_u16() })
        })
        .collect();

    // Assert
    for handle in handles {
        assert_eq!(204, handle.await.expect("Request task panicked"));
    }
}
