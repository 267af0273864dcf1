use std::time::{Duration, SystemTime, UNIX_EPOCH};

use awc::Client;
use cifcast_server::notification::{ImportNotificationBody, NotificationListBody};
use cifcast_server::user::{LoginUserBody, RegisterUserBody, TokenBody, UserBody};
use cifcast_server::Config;

const BASE: &str = "http://localhost:8099";

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:8099".to_string(),
        mongodb_uri: "mongodb://localhost:27017".to_string(),
        mongodb_database: "cifcast_test".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        token_ttl_secs: 3600,
        sweep_interval_secs: 60,
        import_batch_size: 1000,
    }
}

fn unique_username() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("itest-{}", nanos)
}

fn multipart_body(boundary: &str, schedule: &str, sheet: &str) -> String {
    format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\n\
         Summer promo\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"content\"\r\n\r\n\
         A new offer is waiting for you\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"tags\"\r\n\r\n\
         promo, summer\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"schedule\"\r\n\r\n\
         {schedule}\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"cifs.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {sheet}\r\n\
         --{b}--\r\n",
        b = boundary,
        schedule = schedule,
        sheet = sheet,
    )
}

#[actix_rt::test]
#[ignore = "requires a running mongod on localhost:27017"]
async fn upload_and_list_notifications() {
    let _server = std::thread::spawn(|| {
        actix_web::rt::System::new().block_on(cifcast_server::run(test_config()))
    });
    actix_rt::time::sleep(Duration::from_millis(500)).await;

    let client = Client::default();
    let username = unique_username();

    let mut response = client
        .post(format!("{}/auth/register", BASE))
        .send_json(&RegisterUserBody {
            username: username.clone(),
            password: "correct horse battery staple".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let user: UserBody = response.json().await.unwrap();
    assert_eq!(user.username, username);

    let token: TokenBody = client
        .post(format!("{}/auth/login", BASE))
        .send_json(&LoginUserBody {
            username: username.clone(),
            password: "correct horse battery staple".to_string(),
        })
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // No token means 401 before any handler runs.
    let mut response = client
        .get(format!("{}/notifications", BASE))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let error: serde_json::Value = response.json().await.unwrap();
    assert_eq!(error["error_code"], "E4011000");

    let boundary = "------------cifcast-test-boundary";
    let body = multipart_body(boundary, "2099-01-01T09:00:00Z", "12345678\n87654321");
    let mut response = client
        .post(format!("{}/notifications/upload", BASE))
        .insert_header(("Authorization", format!("Bearer {}", token.token)))
        .content_type(format!("multipart/form-data; boundary={}", boundary))
        .send_body(body)
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let imported: ImportNotificationBody = response.json().await.unwrap();
    assert_eq!(imported.notification.title, "Summer promo");
    assert_eq!(imported.notification.cif_count, 2);
    assert_eq!(imported.notification.tags, vec!["promo", "summer"]);

    let listed: NotificationListBody = client
        .get(format!("{}/notifications?page=1&limit=10", BASE))
        .insert_header(("Authorization", format!("Bearer {}", token.token)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.data.len(), 1);
    assert_eq!(listed.data[0].id, imported.notification.id);
}
