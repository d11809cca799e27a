use std::sync::Arc;

use chrono::{Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::password::{hash_password, verify_password};
use super::token::generate_session_token;
use super::AuthError;
use crate::config;
use crate::database::models::{Profile, Role, UserSession};
use crate::database::record::{from_json, now_timestamp, record_id, Record};
use crate::database::{CrudOperations, DataError, DataStore};
use crate::filter::FilterData;
use crate::validation::normalize_phone;

/// Request origin recorded on the session row
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub whatsapp_number: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Body of a successful register or login
#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<Record>,
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct MePayload {
    pub user: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<Record>,
    pub session: SessionInfo,
}

fn row(value: Value) -> Record {
    // json! object literals always produce objects
    from_json(value).unwrap_or_default()
}

fn timestamp_in(days: i64) -> String {
    (Utc::now() + Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Register, login, session validation and logout over the `profiles`,
/// `merchants`, `user_sessions`, `subscription_plans` and `subscriptions` tables
#[derive(Clone)]
pub struct AuthService {
    profiles: CrudOperations,
    merchants: CrudOperations,
    sessions: CrudOperations,
    plans: CrudOperations,
    subscriptions: CrudOperations,
}

impl AuthService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            profiles: CrudOperations::new("profiles", store.clone()),
            merchants: CrudOperations::new("merchants", store.clone()),
            sessions: CrudOperations::new("user_sessions", store.clone()),
            plans: CrudOperations::new("subscription_plans", store.clone()),
            subscriptions: CrudOperations::new("subscriptions", store),
        }
    }

    pub async fn register(&self, input: RegisterInput, client: &ClientInfo) -> Result<AuthPayload, AuthError> {
        let email = input.email.trim().to_lowercase();
        let phone = input.phone.as_deref().map(normalize_phone).filter(|p| !p.is_empty());
        let role = input.role.unwrap_or(Role::Merchant);

        if self.profiles.find_one(FilterData::new().eq("email", email.as_str())).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        if let Some(phone) = &phone {
            if self.profiles.find_one(FilterData::new().eq("phone", phone.as_str())).await?.is_some() {
                return Err(AuthError::PhoneTaken);
            }
        }

        let created = self
            .profiles
            .create(row(json!({
                "email": email,
                "password_hash": hash_password(&input.password),
                "full_name": input.full_name.trim(),
                "phone": phone,
                "role": role,
                "is_active": true,
            })))
            .await
            .map_err(|e| match e {
                DataError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Data(other),
            })?;
        let user = Profile::from_record(created).map_err(|e| AuthError::MalformedRow(e.to_string()))?;
        info!("Registered profile {} ({})", user.id, user.role);

        let merchant = if role == Role::Merchant {
            let merchant = self
                .merchants
                .create(row(json!({
                    "profile_id": user.id,
                    "business_name": input.business_name.unwrap_or_else(|| input.full_name.trim().to_string()),
                    "whatsapp_number": input.whatsapp_number.map(|w| normalize_phone(&w)).or_else(|| phone.clone()),
                    "business_type": input.business_type,
                    "city": input.city,
                    "country": input.country,
                    "currency": input.currency.unwrap_or_else(|| "XOF".to_string()),
                    "is_active": true,
                })))
                .await?;
            if let Some(merchant_id) = record_id(&merchant) {
                self.start_trial(merchant_id).await;
            }
            Some(merchant)
        } else {
            None
        };

        let (token, expires_at) = self.issue_session(user.id, client).await?;
        Ok(AuthPayload { user, merchant, token, expires_at })
    }

    pub async fn login(&self, email: &str, password: &str, client: &ClientInfo) -> Result<AuthPayload, AuthError> {
        let email = email.trim().to_lowercase();
        let record = self
            .profiles
            .find_one(FilterData::new().eq("email", email.as_str()))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let user = Profile::from_record(record).map_err(|e| AuthError::MalformedRow(e.to_string()))?;

        let verified = user.password_hash.as_deref().map_or(false, |h| verify_password(password, h));
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let now = now_timestamp();
        if let Err(e) = self.profiles.update(user.id, row(json!({ "last_login_at": now }))).await {
            warn!("Failed to record last_login_at for profile {}: {}", user.id, e);
        }

        let merchant = self.merchant_for(&user).await?;
        let (token, expires_at) = self.issue_session(user.id, client).await?;
        let user = Profile { last_login_at: Some(now), ..user };
        Ok(AuthPayload { user, merchant, token, expires_at })
    }

    /// Resolve a token to its live session and active profile.
    ///
    /// An expired session is deactivated on the way out.
    pub async fn validate_session(&self, token: &str) -> Result<(UserSession, Profile), AuthError> {
        let record = self
            .sessions
            .find_one(FilterData::new().eq("session_token", token))
            .await?
            .ok_or(AuthError::InvalidSession)?;
        let session = UserSession::from_record(record).map_err(|e| AuthError::MalformedRow(e.to_string()))?;

        if !session.is_active {
            return Err(AuthError::SessionInactive);
        }
        if session.is_expired(Utc::now()) {
            if let Err(e) = self.sessions.update(session.id, row(json!({ "is_active": false }))).await {
                warn!("Failed to deactivate expired session {}: {}", session.id, e);
            }
            return Err(AuthError::SessionExpired);
        }

        let profile = self
            .profiles
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let profile = Profile::from_record(profile).map_err(|e| AuthError::MalformedRow(e.to_string()))?;
        if !profile.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok((session, profile))
    }

    pub async fn me(&self, token: Option<&str>) -> Result<MePayload, AuthError> {
        let token = token.ok_or(AuthError::NoToken)?;
        let (session, user) = self.validate_session(token).await?;

        if let Err(e) = self.sessions.update(session.id, row(json!({ "last_activity_at": now_timestamp() }))).await {
            warn!("Failed to touch session {}: {}", session.id, e);
        }

        let merchant = self.merchant_for(&user).await?;
        Ok(MePayload { user, merchant, session: SessionInfo { expires_at: session.expires_at } })
    }

    /// Deactivate the session behind `token`. Never fails.
    pub async fn logout(&self, token: Option<&str>) {
        let Some(token) = token else {
            return;
        };
        let filter = FilterData::new().eq("session_token", token);
        match self.sessions.update_where(filter, row(json!({ "is_active": false }))).await {
            Ok(rows) if rows.is_empty() => warn!("Logout with unknown session token"),
            Ok(_) => {}
            Err(e) => warn!("Failed to deactivate session on logout: {}", e),
        }
    }

    /// The merchant row owned by a merchant profile
    pub async fn merchant_for(&self, user: &Profile) -> Result<Option<Record>, AuthError> {
        if user.role != Role::Merchant {
            return Ok(None);
        }
        Ok(self.merchants.find_one(FilterData::new().eq("profile_id", user.id)).await?)
    }

    async fn issue_session(&self, user_id: i64, client: &ClientInfo) -> Result<(String, String), AuthError> {
        let token = generate_session_token();
        let expires_at = timestamp_in(config::config().session.expiry_days);
        self.sessions
            .create(row(json!({
                "user_id": user_id,
                "session_token": token,
                "expires_at": expires_at,
                "is_active": true,
                "ip_address": client.ip_address,
                "user_agent": client.user_agent,
                "last_activity_at": now_timestamp(),
            })))
            .await?;
        Ok((token, expires_at))
    }

    /// Trial subscription on the cheapest active plan; failures are logged only
    async fn start_trial(&self, merchant_id: i64) {
        let plan_id = match FilterData::new().eq("is_active", true).order("price asc") {
            Ok(filter) => match self.plans.find_one(filter).await {
                Ok(plan) => plan.as_ref().and_then(record_id),
                Err(e) => {
                    warn!("Could not look up subscription plans: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Invalid plan ordering: {}", e);
                None
            }
        };

        let trial_days = config::config().session.trial_days;
        let now = now_timestamp();
        let ends = timestamp_in(trial_days);
        let subscription = row(json!({
            "merchant_id": merchant_id,
            "plan_id": plan_id,
            "status": "trial",
            "current_period_start": now,
            "current_period_end": ends,
            "trial_ends_at": ends,
        }));
        if let Err(e) = self.subscriptions.create(subscription).await {
            warn!("Failed to create trial subscription for merchant {}: {}", merchant_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn input(email: &str, phone: Option<&str>, role: Option<Role>) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: "motdepasse".to_string(),
            full_name: "Awa Diop".to_string(),
            phone: phone.map(str::to_string),
            role,
            business_name: None,
            whatsapp_number: None,
            business_type: None,
            city: None,
            country: None,
            currency: None,
        }
    }

    #[tokio::test]
    async fn merchant_registration_creates_merchant_and_trial() {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(store.clone());

        let payload = auth
            .register(input("Awa@Example.sn", Some("+221 77 000 11 22"), None), &ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(payload.user.email, "awa@example.sn");
        assert_eq!(payload.user.phone.as_deref(), Some("+221770001122"));
        let merchant = payload.merchant.unwrap();
        assert_eq!(merchant["business_name"], json!("Awa Diop"));
        assert_eq!(store.row_count("subscriptions").await, 1);
        assert_eq!(store.row_count("user_sessions").await, 1);
    }

    #[tokio::test]
    async fn duplicate_email_and_phone_are_rejected() {
        let auth = AuthService::new(Arc::new(MemoryStore::new()));
        auth.register(input("a@b.sn", Some("770001122"), Some(Role::Customer)), &ClientInfo::default())
            .await
            .unwrap();

        let again = auth.register(input("A@B.sn", None, None), &ClientInfo::default()).await;
        assert!(matches!(again, Err(AuthError::EmailTaken)));

        let phone = auth.register(input("c@d.sn", Some("77 000 11 22"), None), &ClientInfo::default()).await;
        assert!(matches!(phone, Err(AuthError::PhoneTaken)));
    }

    #[tokio::test]
    async fn login_then_logout_invalidates_session() {
        let auth = AuthService::new(Arc::new(MemoryStore::new()));
        auth.register(input("a@b.sn", None, Some(Role::Customer)), &ClientInfo::default())
            .await
            .unwrap();

        assert!(matches!(
            auth.login("a@b.sn", "wrong-password", &ClientInfo::default()).await,
            Err(AuthError::InvalidCredentials)
        ));

        let payload = auth.login("a@b.sn", "motdepasse", &ClientInfo::default()).await.unwrap();
        assert!(payload.user.last_login_at.is_some());
        assert!(auth.me(Some(&payload.token)).await.is_ok());

        auth.logout(Some(&payload.token)).await;
        assert!(matches!(auth.me(Some(&payload.token)).await, Err(AuthError::SessionInactive)));
        assert!(matches!(auth.me(None).await, Err(AuthError::NoToken)));
    }
}
