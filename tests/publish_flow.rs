//! Container create / poll / publish flows against a scripted remote.
//!
//! Runs on paused tokio time, so sleeps advance a virtual clock instantly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use graph_poster::graph_api::mock::MockTransport;
use graph_poster::{
    CancellationToken, Config, ContainerParams, Error, GraphApi, MediaPublisher, MediaSource,
    PollOptions, UploadOptions,
};
use serde_json::json;
use tokio::time::Instant;

fn setup() -> (Arc<MockTransport>, MediaPublisher, Arc<Mutex<Vec<String>>>) {
    let mock = Arc::new(MockTransport::new());
    let notes = Arc::new(Mutex::new(Vec::new()));
    let sink = notes.clone();
    let api = GraphApi::with_transport(Config::default().with_user_id("1784"), mock.clone())
        .with_notifier(move |msg: &str| sink.lock().unwrap().push(msg.to_string()));
    let publisher = MediaPublisher::new(api).unwrap();
    (mock, publisher, notes)
}

fn poll(timeout: u64, interval: u64) -> PollOptions {
    PollOptions {
        timeout: Duration::from_secs(timeout),
        interval: Duration::from_secs(interval),
        ..PollOptions::default()
    }
}

fn reel() -> ContainerParams {
    ContainerParams::reel("https://cdn.example.com/reel.mp4", "#happy #funny #smile")
}

#[tokio::test(start_paused = true)]
async fn test_poll_ready_after_one_interval() {
    let (mock, publisher, _) = setup();
    mock.status("IN_PROGRESS").status("FINISHED");
    let started = Instant::now();

    let ready = publisher
        .poll_until_ready("17900", "tok", &poll(10, 5), &CancellationToken::new())
        .await
        .unwrap();

    assert!(ready);
    assert_eq!(started.elapsed(), Duration::from_secs(5));
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_poll_gives_up_at_timeout() {
    let (mock, publisher, _) = setup();
    for _ in 0..5 {
        mock.status("IN_PROGRESS");
    }
    let started = Instant::now();

    let ready = publisher
        .poll_until_ready("17900", "tok", &poll(6, 5), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!ready);
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert!((1..=2).contains(&mock.request_count()));
}

#[tokio::test(start_paused = true)]
async fn test_poll_retries_transient_failure() {
    let (mock, publisher, _) = setup();
    mock.status("IN_PROGRESS")
        .reply_status(
            503,
            json!({"error": {"message": "Service temporarily unavailable", "code": 2}}),
        )
        .status("FINISHED");

    let ready = publisher
        .poll_until_ready("17900", "tok", &poll(60, 5), &CancellationToken::new())
        .await
        .unwrap();

    assert!(ready);
    assert_eq!(mock.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_poll_surfaces_persistent_query_failure() {
    let (mock, publisher, _) = setup();
    for _ in 0..4 {
        mock.fail(Error::Io(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")));
    }

    let err = publisher
        .poll_until_ready("17900", "tok", &poll(120, 5), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::StatusQuery { container_id, attempts, .. } => {
            assert_eq!(container_id, "17900");
            assert_eq!(attempts, 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.request_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_poll_stops_on_error_status() {
    let (mock, publisher, _) = setup();
    mock.status("IN_PROGRESS")
        .reply(json!({"status_code": "ERROR", "status": "Error: unsupported codec"}));

    let err = publisher
        .poll_until_ready("17900", "tok", &poll(120, 5), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::ContainerFailed { ref status, .. } if status.contains("unsupported codec")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_poll_can_be_cancelled_mid_wait() {
    let (mock, publisher, _) = setup();
    for _ in 0..30 {
        mock.status("IN_PROGRESS");
    }
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        trigger.cancel();
    });
    let started = Instant::now();

    let err = publisher
        .poll_until_ready("17900", "tok", &poll(120, 5), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { .. }));
    assert_eq!(started.elapsed(), Duration::from_secs(7));
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_upload_reel_creates_polls_and_publishes() {
    let (mock, publisher, notes) = setup();
    mock.reply(json!({"id": "17900"}))
        .status("IN_PROGRESS")
        .status("FINISHED")
        .reply(json!({"id": "media-42"}));
    let options = UploadOptions {
        poll: Some(poll(30, 5)),
        ..UploadOptions::default()
    };

    let result = publisher.upload_reel(&reel(), "tok", &options).await.unwrap();

    assert_eq!(result.media_id(), Some("media-42"));
    assert_eq!(mock.remaining_replies(), 0);
    let publishes = mock.requests_to("/media_publish");
    assert_eq!(publishes.len(), 1);
    assert_eq!(publishes[0].param_value("creation_id"), Some("17900"));
    assert!(publishes[0].param_value("is_draft").is_none());
    assert!(notes.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_upload_reel_as_draft() {
    let (mock, publisher, _) = setup();
    mock.reply(json!({"id": "17900"}))
        .status("FINISHED")
        .reply(json!({"success": true}));
    let options = UploadOptions {
        is_draft: true,
        ..UploadOptions::default()
    };

    publisher.upload_reel(&reel(), "tok", &options).await.unwrap();

    assert_eq!(mock.requests_to("/media_publish")[0].param_value("is_draft"), Some("true"));
}

#[tokio::test(start_paused = true)]
async fn test_upload_reel_without_container_id_never_publishes() {
    let (mock, publisher, notes) = setup();
    mock.reply_status(
        400,
        json!({"error": {
            "message": "The video file you selected is in a format that we don't support."
        }}),
    );

    let err = publisher
        .upload_reel(&reel(), "tok", &UploadOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upload(_)));
    assert_eq!(mock.request_count(), 1);
    assert!(mock.requests_to("/media_publish").is_empty());
    assert_eq!(notes.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_upload_reel_timeout_never_publishes() {
    let (mock, publisher, notes) = setup();
    mock.reply(json!({"id": "17900"}));
    for _ in 0..10 {
        mock.status("IN_PROGRESS");
    }
    let options = UploadOptions {
        poll: Some(poll(12, 5)),
        ..UploadOptions::default()
    };

    let err = publisher.upload_reel(&reel(), "tok", &options).await.unwrap_err();

    match err {
        Error::ProcessingTimeout { container_id, timeout } => {
            assert_eq!(container_id, "17900");
            assert_eq!(timeout, Duration::from_secs(12));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(mock.requests_to("/media_publish").is_empty());
    assert_eq!(notes.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_upload_reel_error_status_never_publishes() {
    let (mock, publisher, notes) = setup();
    mock.reply(json!({"id": "17900"}))
        .status("IN_PROGRESS")
        .reply(json!({"status_code": "ERROR", "status": "Error: video too long"}))
        .reply(json!({"id": "media-42"}));

    let err = publisher
        .upload_reel(&reel(), "tok", &UploadOptions::default())
        .await
        .unwrap_err();

    match err {
        Error::ContainerFailed { container_id, status } => {
            assert_eq!(container_id, "17900");
            assert!(status.contains("video too long"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(mock.requests_to("/media_publish").is_empty());
    assert_eq!(mock.remaining_replies(), 1);
    assert_eq!(notes.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_upload_reel_uses_configured_poll_options() {
    let mock = Arc::new(MockTransport::new());
    let config = Config::default().with_user_id("1784").with_poll(poll(3, 1));
    let publisher = MediaPublisher::new(GraphApi::with_transport(config, mock.clone())).unwrap();
    mock.reply(json!({"id": "17900"}));
    for _ in 0..10 {
        mock.status("IN_PROGRESS");
    }
    let started = Instant::now();

    let err = publisher
        .upload_reel(&reel(), "tok", &UploadOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ProcessingTimeout { .. }));
    assert_eq!(started.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_upload_story_and_video_use_their_media_types() {
    let (mock, publisher, _) = setup();
    mock.reply(json!({"id": "1"}))
        .status("FINISHED")
        .reply(json!({"id": "story"}))
        .reply(json!({"id": "2"}))
        .status("FINISHED")
        .reply(json!({"id": "video"}));

    let story = publisher
        .upload_story("https://cdn.example.com/s.mp4", "tok", &UploadOptions::default())
        .await
        .unwrap();
    let video = publisher
        .upload_video(
            MediaSource::Bytes(b"mp4".to_vec()),
            MediaSource::Bytes(b"jpg".to_vec()),
            "caption",
            "tok",
            &UploadOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(story.media_id(), Some("story"));
    assert_eq!(video.media_id(), Some("video"));
    let creates = mock.requests_to("/1784/media");
    assert_eq!(creates[0].param_value("media_type"), Some("STORIES"));
    assert_eq!(creates[1].param_value("media_type"), Some("VIDEO"));
    assert_eq!(creates[1].files.len(), 2);
}

#[tokio::test]
async fn test_image_and_carousel_are_single_calls() {
    let (mock, publisher, _) = setup();
    mock.reply(json!({"id": "img-1"}))
        .reply(json!({"id": "img-2"}))
        .reply(json!({"id": "carousel-1"}));

    let first = publisher
        .upload_carousel_item("https://cdn.example.com/1.jpg", "tok")
        .await
        .unwrap()
        .unwrap();
    let second = publisher
        .upload_image_by_url("https://cdn.example.com/2.jpg", "tok")
        .await
        .unwrap()
        .unwrap();
    let carousel = publisher
        .publish_carousel(&[first, second], "album", "tok")
        .await
        .unwrap();

    assert_eq!(carousel.as_deref(), Some("carousel-1"));
    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].param_value("is_carousel_item"), Some("true"));
    assert_eq!(requests[1].param_value("image_url"), Some("https://cdn.example.com/2.jpg"));
    assert_eq!(requests[2].param_value("children"), Some("img-1,img-2"));
}

#[tokio::test]
async fn test_remote_rejection_gives_none() {
    let (mock, publisher, notes) = setup();
    mock.reply_status(
        400,
        json!({"error": {"message": "Only photo or video can be accepted as media type."}}),
    )
        .reply_status(400, json!({"error": {"message": "Invalid children"}}));

    let image = publisher
        .upload_image_by_url("https://cdn.example.com/x.gif", "tok")
        .await
        .unwrap();
    let carousel = publisher
        .publish_carousel(&["1".to_string()], "album", "tok")
        .await
        .unwrap();

    assert!(image.is_none());
    assert!(carousel.is_none());
    assert_eq!(notes.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_transport_failure_is_not_swallowed() {
    let (mock, publisher, _) = setup();
    mock.fail(Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out")));

    let result = publisher
        .upload_image_by_url("https://cdn.example.com/x.jpg", "tok")
        .await;

    assert!(matches!(result, Err(Error::Io(_))));
}
