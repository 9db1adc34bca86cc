use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use qrforge_types::api::{
    AuthResponse, Claims, LoginRequest, ProfileResponse, PublicUser, SignupRequest,
};

use crate::AppState;
use crate::error::ApiError;
use crate::timefmt;

/// Token validity window.
const TOKEN_VALID_DAYS: i64 = 7;

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();

    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide name, email, and password".into(),
        ));
    }

    // Hash password with Argon2id — the plaintext is never stored
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();

    // Email uniqueness is checked and the row inserted under one lock
    let db = state.clone();
    let (uid, n, em) = (user_id.to_string(), name.clone(), email.clone());
    let created = tokio::task::spawn_blocking(move || {
        db.db
            .create_user(&uid, &n, &em, &password_hash, &timefmt::now_utc_string())
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))??;

    if !created {
        return Err(ApiError::DuplicateEmail);
    }

    let token = create_token(&state.jwt_secret, user_id)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser {
                id: user_id,
                name,
                email,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let email = req.email.trim().to_string();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_email(&email))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password — same error as an unknown email
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unparseable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let token = create_token(&state.jwt_secret, user_id)?;

    Ok(Json(AuthResponse {
        token,
        user: PublicUser {
            id: user_id,
            name: user.name,
            email: user.email,
        },
    }))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = claims.sub.to_string();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&uid))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(ProfileResponse {
        id: claims.sub,
        name: user.name,
        email: user.email,
        created_at: timefmt::parse_stored(&user.created_at),
    }))
}

fn create_token(secret: &str, user_id: Uuid) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_VALID_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("token signing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{body_json, claims_for, test_state};
    use jsonwebtoken::{DecodingKey, Validation, decode};

    fn signup_req(name: &str, email: &str, password: &str) -> Json<SignupRequest> {
        Json(SignupRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        })
    }

    #[tokio::test]
    async fn signup_then_login() {
        let state = test_state();

        let resp = signup(
            State(state.clone()),
            signup_req("Alice", "a@x.com", "secret1"),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["user"]["name"], "Alice");
        assert_eq!(body["user"]["email"], "a@x.com");
        // The hash never leaves the server
        assert!(body["user"].get("password").is_none());

        let resp = login(
            State(state),
            Json(LoginRequest {
                email: "a@x.com".into(),
                password: "secret1".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["user"]["email"], "a@x.com");
    }

    #[tokio::test]
    async fn signup_rejects_blank_fields() {
        let state = test_state();
        let err = signup(State(state), signup_req("  ", "a@x.com", "secret1"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let state = test_state();
        signup(
            State(state.clone()),
            signup_req("Alice", "a@x.com", "secret1"),
        )
        .await
        .unwrap();

        let err = signup(State(state), signup_req("Imposter", "a@x.com", "other"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let resp = err.into_response();
        let body = body_json(resp).await;
        assert_eq!(body["message"], "User already exists with this email");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let state = test_state();
        signup(
            State(state.clone()),
            signup_req("Alice", "a@x.com", "secret1"),
        )
        .await
        .unwrap();

        let wrong_password = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "a@x.com".into(),
                password: "wrong".into(),
            }),
        )
        .await
        .err()
        .unwrap();
        let unknown_email = login(
            State(state),
            Json(LoginRequest {
                email: "nobody@x.com".into(),
                password: "secret1".into(),
            }),
        )
        .await
        .err()
        .unwrap();

        assert_eq!(wrong_password.status(), unknown_email.status());
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn profile_roundtrip_and_unknown_user() {
        let state = test_state();
        let resp = signup(
            State(state.clone()),
            signup_req("Alice", "a@x.com", "secret1"),
        )
        .await
        .unwrap()
        .into_response();
        let body = body_json(resp).await;
        let user_id: Uuid = body["user"]["id"].as_str().unwrap().parse().unwrap();

        let resp = profile(State(state.clone()), Extension(claims_for(user_id)))
            .await
            .unwrap()
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["email"], "a@x.com");
        assert!(body.get("password").is_none());

        let err = profile(State(state), Extension(claims_for(Uuid::new_v4())))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn token_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = create_token("test-secret", user_id).unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, user_id);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = create_token("test-secret", Uuid::new_v4()).unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            exp: (chrono::Utc::now() - chrono::Duration::days(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
