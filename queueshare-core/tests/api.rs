//! Endpoint wrappers against a mock backend

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{TimeZone, Utc};
use queueshare_core::api::{AuthApi, PlaybackCommand, RoomsApi, StatsApi};
use queueshare_core::{
    ApiClient, ApiError, Config, RankingKind, RankingPeriod, RoomCredentials, RoomRole,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    let config = Config {
        backend_url: server.uri().parse().unwrap(),
        ..Default::default()
    };

    ApiClient::new(&config).unwrap()
}

#[tokio::test]
async fn login_returns_token_and_expiry() {
    let server = MockServer::start().await;
    let expected = format!("Basic {}", STANDARD.encode("mary:hunter2"));

    Mock::given(method("GET"))
        .and(path("/auth/token"))
        .and(header("Authorization", expected.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok",
            "expires_at": "2030-01-02T03:04:05Z"
        })))
        .mount(&server)
        .await;

    let token = AuthApi::new(&client_for(&server))
        .token("mary", "hunter2")
        .await
        .unwrap();

    assert_eq!(token.token, "tok");
    assert_eq!(
        token.expires_at,
        Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap()
    );
}

#[tokio::test]
async fn spotify_authorize_url_carries_redirect() {
    let config = Config::default();
    let client = ApiClient::new(&config).unwrap();

    let url = AuthApi::new(&client)
        .spotify_authorize_url("http://localhost:3000/account/spotify")
        .unwrap();

    assert_eq!(
        url,
        "http://localhost:8000/spotify/authorize?redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Faccount%2Fspotify"
    );
}

#[tokio::test]
async fn room_fetch_and_guest_registration() {
    let server = MockServer::start().await;
    let guest_auth = format!("Basic {}", STANDARD.encode("Alice:abc123"));

    Mock::given(method("POST"))
        .and(path("/room/ABC/guest"))
        .and(header("Authorization", guest_auth.as_str()))
        .and(body_json(json!({ "name": "Alice" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "guest_id": "g-7" })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/room/ABC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Friday",
            "code": "ABC",
            "host": { "id": "u1", "username": "mary" },
            "role": "guest",
            "guest_name": "Alice"
        })))
        .mount(&server)
        .await;

    let rooms = RoomsApi::new(&client_for(&server));

    let registration = rooms.register_guest("ABC", "Alice", "abc123").await.unwrap();
    assert_eq!(registration.guest_id, "g-7");

    let room = rooms
        .room(
            "ABC",
            Some(&RoomCredentials::Guest {
                guest_id: registration.guest_id,
                room_password: "abc123".into(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(room.role, RoomRole::Guest);
    assert_eq!(room.guest_name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn playback_commands_hit_their_paths() {
    let server = MockServer::start().await;

    for command in ["play", "pause", "next", "previous"] {
        Mock::given(method("POST"))
            .and(path(format!("/room/ABC/{}", command)))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "currently_playing": { "id": command, "paused": (command == "pause") }
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let rooms = RoomsApi::new(&client_for(&server));
    let credentials = RoomCredentials::resolve(Some("tok"), None, None).unwrap();

    for command in [
        PlaybackCommand::Play,
        PlaybackCommand::Pause,
        PlaybackCommand::Next,
        PlaybackCommand::Previous,
    ] {
        let payload = rooms.playback("ABC", &credentials, command).await.unwrap();
        let playing = payload.currently_playing.unwrap();

        assert_eq!(playing.track.id, command.as_str());
        assert_eq!(playing.paused, command == PlaybackCommand::Pause);
        assert_eq!(payload.queue, None);
    }
}

#[tokio::test]
async fn rankings_send_period_as_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rankings/artists/month"))
        .and(query_param("year", "2024"))
        .and(query_param("month", "3"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "position": 1, "previous_position": 4, "name": "Daft Punk", "streams": 120 },
            { "position": 2, "name": "Justice", "streams": 80 }
        ])))
        .mount(&server)
        .await;

    let rankings = StatsApi::new(&client_for(&server))
        .rankings(
            "tok",
            RankingKind::Artists,
            RankingPeriod::Month {
                year: 2024,
                month: 3,
            },
        )
        .await
        .unwrap();

    assert_eq!(rankings.len(), 2);
    assert_eq!(rankings[0].previous_position, Some(4));
    assert_eq!(rankings[1].previous_position, None);
}

#[tokio::test]
async fn malformed_body_is_a_contract_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats/calendar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "days": 3 })))
        .mount(&server)
        .await;

    let error = StatsApi::new(&client_for(&server))
        .calendar("tok", 2024)
        .await
        .unwrap_err();

    assert!(matches!(error, ApiError::Decode(_)));
    assert!(error.is_contract());
}
