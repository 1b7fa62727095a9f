use std::sync::Arc;
use chrono::{Duration, Utc};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::JwtClaims;

use crate::jwt::sign_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub api_base_url: String,
    pub frontend_project_root: String,
    pub environment: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            api_base_url: "http://localhost:8000".to_string(),
            frontend_project_root: "/tmp/MedicationReminderRN".to_string(),
            environment: "test".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            redis_url: None,
            api_base_url: self.api_base_url.clone(),
            frontend_project_root: self.frontend_project_root.clone(),
            environment: self.environment.clone(),
            installed_modules: vec![
                "auth".to_string(),
                "users".to_string(),
                "medications".to_string(),
                "schedules".to_string(),
            ],
            service_account_id: Uuid::new_v4().to_string(),
            service_account_email: "monitor@example.com".to_string(),
            probe_concurrency: 4,
            component_timeout_ms: 200,
            monitoring_interval_secs: None,
            monitoring_state_path: None,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = JwtClaims {
            sub: user.id.clone(),
            exp: Some(exp.timestamp().max(0) as u64),
            email: Some(user.email.clone()),
            role: Some(user.role.clone()),
            app_metadata: None,
            user_metadata: None,
            aud: None,
            iat: Some(now.timestamp() as u64),
        };

        sign_token(&claims, secret).expect("test secret must not be empty")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}
