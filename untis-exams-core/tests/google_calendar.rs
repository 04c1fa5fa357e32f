use chrono::{DateTime, FixedOffset};
use mockito::{Matcher, Server};
use reqwest::Url;
use serde_json::json;
use untis_exams_core::{
    Error,
    calendar::{CalendarBackend, EventDraft, GoogleCalendar},
    http::HttpClientBuilder,
};

const EVENTS_PATH: &str = "/calendar/v3/calendars/abc@group.calendar.google.com/events";

fn calendar_for(base: &str) -> GoogleCalendar {
    GoogleCalendar::with_client(
        HttpClientBuilder::new().build().unwrap(),
        Url::parse(&format!("{base}/calendar/v3/")).unwrap(),
        "token-123",
    )
}

fn at(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value).unwrap()
}

fn draft() -> EventDraft {
    EventDraft {
        summary: "Math".to_string(),
        start: at("2024-09-12T08:00:00+02:00"),
        end: at("2024-09-12T08:45:00+02:00"),
        description: Some("Math SA".to_string()),
        time_zone: "Europe/Vienna".to_string(),
        use_default_reminders: true,
    }
}

#[tokio::test]
async fn test_list_events_follows_pages() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", EVENTS_PATH)
        .match_header("authorization", "Bearer token-123")
        .match_query(Matcher::Regex(
            "^showDeleted=false&singleEvents=true&orderBy=startTime&maxResults=2500$".to_string(),
        ))
        .with_status(200)
        .with_body(
            json!({
                "items": [
                    { "id": "a", "summary": "Math",
                      "start": { "dateTime": "2024-09-12T09:00:00+02:00" },
                      "end": { "dateTime": "2024-09-12T09:45:00+02:00" } },
                    { "id": "b", "summary": "Holidays",
                      "start": { "date": "2024-09-13" }, "end": { "date": "2024-09-14" } }
                ],
                "nextPageToken": "p2"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::UrlEncoded("pageToken".into(), "p2".into()))
        .with_status(200)
        .with_body(
            json!({
                "items": [
                    { "id": "c", "summary": "Physics",
                      "start": { "dateTime": "2024-09-20T10:00:00+02:00" },
                      "end": { "dateTime": "2024-09-20T10:45:00+02:00" } }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let events = calendar_for(&server.url()).list_events("abc").await.unwrap();

    let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["a", "c"]);
    assert_eq!(events[0].start, at("2024-09-12T09:00:00+02:00"));

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_insert_event() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", EVENTS_PATH)
        .match_header("authorization", "Bearer token-123")
        .match_body(Matcher::Json(json!({
            "summary": "Math",
            "description": "Math SA",
            "start": { "dateTime": "2024-09-12T08:00:00+02:00", "timeZone": "Europe/Vienna" },
            "end": { "dateTime": "2024-09-12T08:45:00+02:00", "timeZone": "Europe/Vienna" },
            "reminders": { "useDefault": true }
        })))
        .with_status(200)
        .with_body(
            json!({
                "id": "new-1", "summary": "Math", "description": "Math SA",
                "start": { "dateTime": "2024-09-12T08:00:00+02:00", "timeZone": "Europe/Vienna" },
                "end": { "dateTime": "2024-09-12T08:45:00+02:00", "timeZone": "Europe/Vienna" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let created = calendar_for(&server.url())
        .insert_event("abc", &draft())
        .await
        .unwrap();

    assert_eq!(created.id, "new-1");
    assert_eq!(created.start, draft().start);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_update_event_targets_id() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", format!("{EVENTS_PATH}/evt-1").as_str())
        .match_body(Matcher::PartialJson(json!({ "summary": "Math" })))
        .with_status(200)
        .with_body(
            json!({
                "id": "evt-1", "summary": "Math",
                "start": { "dateTime": "2024-09-12T08:00:00+02:00" },
                "end": { "dateTime": "2024-09-12T08:45:00+02:00" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let updated = calendar_for(&server.url())
        .update_event("abc", "evt-1", &draft())
        .await
        .unwrap();

    assert_eq!(updated.id, "evt-1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_error_message() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", EVENTS_PATH)
        .with_status(403)
        .with_body(r#"{"error":{"code":403,"message":"Rate Limit Exceeded"}}"#)
        .create_async()
        .await;

    match calendar_for(&server.url())
        .insert_event("abc", &draft())
        .await
        .unwrap_err()
    {
        Error::Calendar(message) => {
            assert!(message.contains("403"));
            assert!(message.contains("Rate Limit Exceeded"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
