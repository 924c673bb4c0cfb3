use kagi_widevine::{
    base64_encode, Cdm, CdmError, DeviceProfile, KeyId, KeyType, RemoteCdm, Session,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn profile(server: &MockServer) -> DeviceProfile {
    DeviceProfile::from_json(
        &json!({
            "host": server.uri(),
            "secret": "s3cr3t",
            "device_name": "android",
        })
        .to_string(),
    )
    .unwrap()
}

async fn mount_open(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/android/open"))
        .and(header("X-Secret-Key", "s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "Success",
            "data": { "session_id": "abc123", "device": { "system_id": 1, "security_level": 3 } }
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_close(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/android/close/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "Successfully closed Session 'abc123'."
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_remote_license_exchange() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_open(&server).await;
    mount_close(&server).await;

    Mock::given(method("POST"))
        .and(path("/android/get_license_challenge/STREAMING"))
        .and(body_json(json!({
            "session_id": "abc123",
            "init_data": "AAAAOHBzc2g=",
            "privacy_mode": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "Success",
            "data": { "challenge_b64": base64_encode([0x08, 0x01, 0x12]) }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/android/parse_license"))
        .and(body_json(json!({
            "session_id": "abc123",
            "license_message": base64_encode(b"license"),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "Successfully parsed and loaded the Keys from the License message."
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/android/get_keys/ALL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "message": "Success",
            "data": { "keys": [
                { "key_id": "00000000000000000000000000000000", "key": "aa".repeat(32), "type": "SIGNING", "permissions": [] },
                { "key_id": "11111111-2222-3333-4444-555555555555", "key": "bb".repeat(16), "type": "CONTENT", "permissions": [] }
            ]}
        })))
        .mount(&server)
        .await;

    let cdm = RemoteCdm::new(profile(&server));
    let mut session = Session::open(&cdm).await?;
    let challenge = session.generate_challenge("AAAAOHBzc2g=").await?;
    assert_eq!(challenge, vec![0x08, 0x01, 0x12]);

    let keys = session.parse_license_and_extract_keys(b"license").await?;
    session.close().await?;

    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].r#type, KeyType::Content);
    assert_eq!(
        keys[0].kid,
        "11111111222233334444555555555555".parse::<KeyId>()?
    );
    assert_eq!(
        keys[0].to_string(),
        format!("11111111222233334444555555555555:{}", "bb".repeat(16))
    );
    Ok(())
}

#[tokio::test]
async fn test_remote_license_rejected() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_open(&server).await;

    Mock::given(method("POST"))
        .and(path("/android/parse_license"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": 400,
            "message": "Invalid License, Signature mismatch."
        })))
        .mount(&server)
        .await;

    let cdm = RemoteCdm::new(profile(&server));
    let session_id = cdm.open().await?;
    let result = cdm.parse_license(&session_id, b"garbage").await;
    match result {
        Err(CdmError::LicenseRejected(message)) => {
            assert_eq!(message, "Invalid License, Signature mismatch.")
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_remote_unknown_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/android/open"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let cdm = RemoteCdm::new(profile(&server));
    match Session::open(&cdm).await {
        Err(CdmError::RemoteCdm { status, message }) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "Unauthorized");
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("session should not open"),
    };
}
