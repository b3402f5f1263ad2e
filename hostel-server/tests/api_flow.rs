//! End-to-end flows through the full router (auth middleware + handlers + SQLite)

use axum::Router;
use axum::body::Body;
use chrono::{Duration, Utc};
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use hostel_server::core::{Config, ServerState};
use hostel_server::db::DbService;
use hostel_server::db::repository::user;
use hostel_server::{auth, build_app};
use shared::models::{Role, UserCreate};
use shared::util::now_millis;

const PASSWORD: &str = "password123";

struct TestApp {
    app: Router,
    state: ServerState,
}

impl TestApp {
    async fn new() -> Self {
        let db = DbService::memory().await.unwrap();
        let state = ServerState::new(Config::for_tests(), db);
        let app = build_app(&state).with_state(state.clone());
        Self { app, state }
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Seed a non-student account directly and log in as it
    async fn seed(&self, id: i64, email: &str, role: Role) -> String {
        let data = UserCreate {
            name: format!("{role:?} {id}"),
            email: email.to_string(),
            password: PASSWORD.to_string(),
            role,
            room_number: None,
            floor: None,
            hostel_block: None,
            phone: None,
        };
        let hash = auth::hash_password(PASSWORD).unwrap();
        user::create(&self.state.pool, id, &data, &hash, now_millis())
            .await
            .unwrap();
        self.login(email).await
    }

    async fn register_student(&self, email: &str, room: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": "Student",
                    "email": email,
                    "password": PASSWORD,
                    "room_number": room,
                    "floor": 1,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        self.login(email).await
    }
}

fn id_of(body: &Value) -> i64 {
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_is_public_and_api_requires_token() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.call(Method::GET, "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);

    let (status, body) = app
        .call(Method::GET, "/api/orders", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1004);
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new().await;

    let register = json!({
        "name": "Asha",
        "email": "Asha@Example.com",
        "password": PASSWORD,
        "room_number": "B-204",
    });
    let (status, body) = app
        .call(Method::POST, "/api/auth/register", None, Some(register.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "asha@example.com");
    assert_eq!(body["data"]["role"], "student");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = app
        .call(Method::POST, "/api/auth/register", None, Some(register))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 1101);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "asha@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1002);

    let token = app.login("ASHA@example.com").await;
    let (status, body) = app
        .call(Method::GET, "/api/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Asha");
    assert_eq!(body["data"]["room_number"], "B-204");
}

#[tokio::test]
async fn test_disabled_account_cannot_log_in() {
    let app = TestApp::new().await;
    let admin = app.seed(1, "admin@hostel.test", Role::Admin).await;
    let _ = app.register_student("ravi@hostel.test", "A-101").await;

    let (_, body) = app
        .call(Method::GET, "/api/users?role=student", Some(&admin), None)
        .await;
    assert_eq!(body["data"]["total"], 1);
    let student_id = body["data"]["data"][0]["id"].as_i64().unwrap();

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/users/{student_id}/active"),
            Some(&admin),
            Some(json!({ "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ravi@hostel.test", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1007);
}

#[tokio::test]
async fn test_student_cannot_manage_catalog() {
    let app = TestApp::new().await;
    let student = app.register_student("ravi@hostel.test", "A-101").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/categories",
            Some(&student),
            Some(json!({ "name": "Snacks" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2001);
}

#[tokio::test]
async fn test_canteen_order_flow() {
    let app = TestApp::new().await;
    let admin = app.seed(1, "admin@hostel.test", Role::Admin).await;
    let student = app.register_student("ravi@hostel.test", "A-101").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/categories",
            Some(&admin),
            Some(json!({ "name": "Meals" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let category_id = id_of(&body);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/menu-items",
            Some(&admin),
            Some(json!({
                "name": "Veg Thali",
                "category_id": category_id,
                "price": 50.0,
                "stock": 3,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let item_id = id_of(&body);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/cart/items",
            Some(&student),
            Some(json!({ "menu_item_id": item_id, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_amount"], 100.0);
    assert_eq!(body["data"]["item_count"], 2);

    // 2 in cart + 2 more > stock 3
    let (status, body) = app
        .call(
            Method::POST,
            "/api/cart/items",
            Some(&student),
            Some(json!({ "menu_item_id": item_id, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 6004);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(&student),
            Some(json!({ "delivery_address": { "room_number": "A-101" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = &body["data"];
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(order["total_amount"], 100.0);
    assert_eq!(order["delivery_fee"], 0.0);
    assert_eq!(order["final_amount"], 100.0);
    assert_eq!(order["status"], "pending");
    assert!(order["order_number"].as_str().unwrap().ends_with("0001"));

    let (_, body) = app.call(Method::GET, "/api/cart", Some(&student), None).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);

    let (_, body) = app
        .call(Method::GET, &format!("/api/menu-items/{item_id}"), Some(&student), None)
        .await;
    assert_eq!(body["data"]["stock"], 1);

    let rating = json!({ "food_rating": 5, "delivery_rating": 4 });
    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/orders/{order_id}/rating"),
            Some(&student),
            Some(rating.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 4005);

    // student cannot drive the kitchen workflow
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/orders/{order_id}/status"),
            Some(&student),
            Some(json!({ "status": "confirmed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for next in ["confirmed", "preparing", "ready", "out_for_delivery", "delivered"] {
        let (status, body) = app
            .call(
                Method::PUT,
                &format!("/api/orders/{order_id}/status"),
                Some(&admin),
                Some(json!({ "status": next })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{next}: {body}");
        assert_eq!(body["data"]["status"], next);
    }

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/orders/{order_id}/rating"),
            Some(&student),
            Some(rating),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rating"]["food_rating"], 5);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/orders/{order_id}/cancel"),
            Some(&student),
            Some(json!({ "reason": "Too late" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 4002);

    let (_, body) = app.call(Method::GET, "/api/orders", Some(&student), None).await;
    assert_eq!(body["data"]["total"], 1);
}

fn outpass_payload() -> Value {
    let today = Utc::now().date_naive();
    json!({
        "reason": "Visiting family for the weekend",
        "outpass_type": "home",
        "out_date": (today + Duration::days(2)).format("%Y-%m-%d").to_string(),
        "out_time": "09:00",
        "in_date": (today + Duration::days(4)).format("%Y-%m-%d").to_string(),
        "in_time": "18:00",
        "destination": "Pune",
        "contact_number": "9876543210",
        "emergency_contact": {
            "name": "Sunita",
            "phone": "9876543211",
            "relation": "mother",
        },
        "transport_mode": "bus",
        "parent_approval_required": false,
        "documents": [],
        "rules_acknowledged": true,
    })
}

#[tokio::test]
async fn test_outpass_lifecycle() {
    let app = TestApp::new().await;
    let warden = app.seed(2, "warden@hostel.test", Role::Staff).await;
    let student = app.register_student("ravi@hostel.test", "A-101").await;

    let (status, body) = app
        .call(Method::POST, "/api/outpass", Some(&student), Some(outpass_payload()))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let id = id_of(&body);

    let review = json!({ "approve": true, "notes": "Enjoy" });
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/outpass/{id}/review"),
            Some(&student),
            Some(review.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/outpass/{id}/review"),
            Some(&warden),
            Some(review),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "approved");

    let (status, body) = app
        .call(Method::POST, &format!("/api/outpass/{id}/cancel"), Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 7002);

    let (status, body) = app
        .call(Method::POST, &format!("/api/outpass/{id}/checkout"), Some(&warden), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "checked_out");

    let (status, body) = app
        .call(Method::POST, &format!("/api/outpass/{id}/checkin"), Some(&warden), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "returned");
    assert_eq!(body["data"]["status_history"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_announcement_targeting_and_event_capacity() {
    let app = TestApp::new().await;
    let admin = app.seed(1, "admin@hostel.test", Role::Admin).await;
    let warden = app.seed(2, "warden@hostel.test", Role::Staff).await;
    let ravi = app.register_student("ravi@hostel.test", "A-101").await;
    let meera = app.register_student("meera@hostel.test", "A-102").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/announcements",
            Some(&admin),
            Some(json!({
                "title": "Room inspection",
                "content": "Rooms will be inspected on Friday",
                "category": "notice",
                "target_audience": "students",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let notice_id = id_of(&body);

    let (_, body) = app
        .call(Method::GET, "/api/announcements", Some(&ravi), None)
        .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["data"][0]["is_read"], false);

    let (_, body) = app
        .call(Method::GET, "/api/announcements", Some(&warden), None)
        .await;
    assert_eq!(body["data"]["total"], 0);

    let uri = format!("/api/announcements/{notice_id}");
    app.call(Method::GET, &uri, Some(&ravi), None).await;
    let (status, body) = app.call(Method::GET, &uri, Some(&ravi), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["views"], 1);
    assert_eq!(body["data"]["is_read"], true);

    let now = now_millis();
    let day = 24 * 60 * 60 * 1000;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/announcements",
            Some(&admin),
            Some(json!({
                "title": "Movie night",
                "content": "Common room, bring snacks",
                "category": "event",
                "event_details": {
                    "start_date": now + day,
                    "end_date": now + 2 * day,
                    "max_participants": 1,
                    "registration_required": true,
                },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let register_uri = format!("/api/announcements/{}/register", id_of(&body));

    let (status, body) = app
        .call(Method::POST, &register_uri, Some(&ravi), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_registered"], true);

    let (status, body) = app
        .call(Method::POST, &register_uri, Some(&ravi), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 3004);

    let (status, body) = app
        .call(Method::POST, &register_uri, Some(&meera), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 3003);

    // 取消报名后名额释放
    let (status, _) = app
        .call(Method::DELETE, &register_uri, Some(&ravi), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(Method::POST, &register_uri, Some(&meera), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_maintenance_flow() {
    let app = TestApp::new().await;
    let warden = app.seed(2, "warden@hostel.test", Role::Staff).await;
    let student = app.register_student("ravi@hostel.test", "C-12").await;
    let other = app.register_student("neha@hostel.test", "C-14").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/maintenance",
            Some(&student),
            Some(json!({
                "title": "Leaking tap",
                "description": "Bathroom tap drips all night",
                "category": "plumbing",
                "location": { "room_number": "C-12", "floor": 1 },
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let id = id_of(&body);

    // 只有 maintenance:manage 能改状态或指派
    let status_uri = format!("/api/maintenance/{id}/status");
    let (status, body) = app
        .call(
            Method::PUT,
            &status_uri,
            Some(&student),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2001);

    let (status, _) = app
        .call(Method::GET, &format!("/api/maintenance/{id}"), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::GET, "/api/maintenance", Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/maintenance/{id}/assign"),
            Some(&warden),
            Some(json!({ "assigned_to": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "acknowledged");
    assert_eq!(body["data"]["assigned_to"], 2);

    // 未完成前不能评分
    let rating = json!({ "score": 4, "feedback": "Fixed quickly" });
    let rating_uri = format!("/api/maintenance/{id}/rating");
    let (status, body) = app
        .call(Method::POST, &rating_uri, Some(&student), Some(rating.clone()))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 5003);

    for next in ["in_progress", "completed"] {
        let (status, body) = app
            .call(
                Method::PUT,
                &status_uri,
                Some(&warden),
                Some(json!({ "status": next, "notes": "Washer replaced" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["status"], next);
    }

    let (status, body) = app
        .call(Method::POST, &rating_uri, Some(&other), Some(rating.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2004);

    let (status, body) = app
        .call(Method::POST, &rating_uri, Some(&student), Some(rating))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["rating"]["score"], 4);

    let cancel_uri = format!("/api/maintenance/{id}/cancel");
    let (status, body) = app
        .call(Method::POST, &cancel_uri, Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2004);

    let (status, body) = app
        .call(Method::POST, &cancel_uri, Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 5002);
}
