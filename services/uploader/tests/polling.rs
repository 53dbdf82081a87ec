//! Integration tests for the upload-and-poll controller
//!
//! The relay is replaced by a scripted `VideoApi`, and tokio's clock is
//! paused so the poll interval elapses instantly and deterministically.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use common::UploadResult;
use reqwest::StatusCode;
use serde_json::json;
use tokio::{
    sync::Notify,
    time::{self, Instant},
};
use uploader::{ClientError, MIN_POLL_INTERVAL, Phase, UploadController, VideoApi, VideoFile};

const INTERVAL: Duration = Duration::from_secs(5);

/// One scripted answer to a status request
#[derive(Clone)]
enum Step {
    Status(UploadResult),
    /// Answers only once the gate is opened
    Held(Arc<Notify>, UploadResult),
    Unreachable,
    Crash,
}

#[derive(Default)]
struct ScriptedApi {
    /// Initial record returned per uploaded file name
    uploads: Mutex<HashMap<String, UploadResult>>,
    /// Remaining answers per uid, the last one repeats forever
    statuses: Mutex<HashMap<String, VecDeque<Step>>>,
    /// Every status request, in order
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedApi {
    fn on_upload(self, file_name: &str, result: UploadResult) -> Self {
        self.uploads
            .lock()
            .unwrap()
            .insert(file_name.to_string(), result);
        self
    }

    fn on_status(self, uid: &str, steps: Vec<Step>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(uid.to_string(), steps.into());
        self
    }

    fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, uid: &str) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|(called, _)| called == uid)
            .map(|(_, at)| at)
            .collect()
    }
}

#[async_trait]
impl VideoApi for ScriptedApi {
    async fn upload(&self, file: VideoFile) -> Result<UploadResult, ClientError> {
        self.uploads
            .lock()
            .unwrap()
            .get(&file.file_name)
            .cloned()
            .ok_or_else(|| ClientError::Relay {
                status: StatusCode::BAD_REQUEST,
                message: "Storage capacity exceeded".to_string(),
            })
    }

    async fn status(&self, uid: &str) -> Result<UploadResult, ClientError> {
        self.calls
            .lock()
            .unwrap()
            .push((uid.to_string(), Instant::now()));

        let step = {
            let mut statuses = self.statuses.lock().unwrap();
            let steps = statuses.get_mut(uid).expect("status requested for unknown uid");
            if steps.len() > 1 {
                steps.pop_front().unwrap()
            } else {
                steps.front().cloned().unwrap()
            }
        };

        match step {
            Step::Status(result) => Ok(result),
            Step::Held(gate, result) => {
                gate.notified().await;
                Ok(result)
            }
            Step::Crash => panic!("status handler crashed"),
            Step::Unreachable => Err(ClientError::Relay {
                status: StatusCode::BAD_GATEWAY,
                message: "Failed to get video status".to_string(),
            }),
        }
    }
}

fn video(uid: &str, state: &str) -> UploadResult {
    serde_json::from_value(json!({
        "uid": uid,
        "preview": format!("https://customer.example.com/{uid}/watch"),
        "readyToStream": state == "ready",
        "status": {
            "state": state,
            "errorReasonCode": "",
            "errorReasonText": ""
        },
        "playback": {
            "hls": format!("https://customer.example.com/{uid}/manifest/video.m3u8"),
            "dash": format!("https://customer.example.com/{uid}/manifest/video.mpd")
        }
    }))
    .unwrap()
}

fn failed_video(uid: &str, reason: &str) -> UploadResult {
    let mut result = video(uid, "failed");
    result.status.error_reason_code = Some("ERR_TRANSCODE".to_string());
    result.status.error_reason_text = Some(reason.to_string());
    result
}

fn file(name: &str) -> Option<VideoFile> {
    Some(VideoFile {
        file_name: name.to_string(),
        content_type: Some("video/mp4".to_string()),
        data: b"fake-video-bytes".to_vec(),
    })
}

fn controller(api: &Arc<ScriptedApi>) -> UploadController {
    UploadController::new(api.clone()).with_interval(INTERVAL)
}

#[tokio::test(start_paused = true)]
async fn polling_stops_after_ready() {
    let api = Arc::new(
        ScriptedApi::default()
            .on_upload("clip.mp4", video("vid-1", "queued"))
            .on_status(
                "vid-1",
                vec![
                    Step::Status(video("vid-1", "processing")),
                    Step::Status(video("vid-1", "ready")),
                ],
            ),
    );
    let mut controller = controller(&api);

    let started = Instant::now();
    let snapshot = controller.start_upload(file("clip.mp4")).await;
    assert_eq!(snapshot.phase, Phase::Polling);
    assert_eq!(snapshot.result.as_ref().unwrap().status.state, "queued");

    let settled = controller.wait_until_settled().await;
    assert_eq!(settled.phase, Phase::Ready);
    assert_eq!(
        settled.message().as_deref(),
        Some("Video is ready to stream!")
    );

    let calls = api.calls_for("vid-1");
    assert_eq!(calls.len(), 2);
    assert!(calls[0] - started >= INTERVAL);
    assert_eq!(calls[1] - calls[0], INTERVAL);

    time::sleep(INTERVAL * 10).await;
    assert_eq!(api.calls().len(), 2, "no request may follow readyToStream");
}

#[tokio::test(start_paused = true)]
async fn polling_stops_on_remote_failure() {
    let api = Arc::new(
        ScriptedApi::default()
            .on_upload("clip.mp4", video("vid-1", "queued"))
            .on_status(
                "vid-1",
                vec![
                    Step::Status(video("vid-1", "processing")),
                    Step::Status(failed_video("vid-1", "transcode error")),
                ],
            ),
    );
    let mut controller = controller(&api);

    controller.start_upload(file("clip.mp4")).await;
    let settled = controller.wait_until_settled().await;

    assert_eq!(settled.phase, Phase::Failed);
    assert!(settled.message().unwrap().contains("transcode error"));

    time::sleep(INTERVAL * 10).await;
    assert_eq!(api.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn second_upload_cancels_polling_of_the_first() {
    let api = Arc::new(
        ScriptedApi::default()
            .on_upload("first.mp4", video("first", "queued"))
            .on_upload("second.mp4", video("second", "queued"))
            .on_status("first", vec![Step::Status(video("first", "inprogress"))])
            .on_status(
                "second",
                vec![
                    Step::Status(video("second", "inprogress")),
                    Step::Status(video("second", "ready")),
                ],
            ),
    );
    let mut controller = controller(&api);

    controller.start_upload(file("first.mp4")).await;
    time::sleep(INTERVAL + Duration::from_secs(1)).await;
    assert_eq!(api.calls_for("first").len(), 1);

    let restarted = Instant::now();
    let snapshot = controller.start_upload(file("second.mp4")).await;
    assert_eq!(snapshot.result.as_ref().unwrap().uid, "second");

    let settled = controller.wait_until_settled().await;
    assert_eq!(settled.phase, Phase::Ready);
    assert_eq!(settled.result.unwrap().uid, "second");

    time::sleep(INTERVAL * 10).await;
    let first_calls = api.calls_for("first");
    assert_eq!(first_calls.len(), 1);
    assert!(first_calls.iter().all(|at| *at < restarted));
    assert_eq!(api.calls_for("second").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn unchanged_remote_state_gives_identical_snapshots() {
    let api = Arc::new(
        ScriptedApi::default()
            .on_upload("clip.mp4", video("vid-1", "queued"))
            .on_status("vid-1", vec![Step::Status(video("vid-1", "inprogress"))]),
    );
    let mut controller = controller(&api);

    controller.start_upload(file("clip.mp4")).await;
    time::sleep(INTERVAL + Duration::from_secs(1)).await;
    let after_first_poll = controller.snapshot();

    time::sleep(INTERVAL * 3).await;
    let after_more_polls = controller.snapshot();

    assert_eq!(api.calls().len(), 4);
    assert_eq!(after_first_poll.phase, Phase::Polling);
    assert_eq!(after_first_poll, after_more_polls);
}

#[tokio::test(start_paused = true)]
async fn relay_error_while_polling_interrupts_without_retry() {
    let api = Arc::new(
        ScriptedApi::default()
            .on_upload("clip.mp4", video("vid-1", "queued"))
            .on_status(
                "vid-1",
                vec![
                    Step::Status(video("vid-1", "inprogress")),
                    Step::Unreachable,
                    Step::Status(video("vid-1", "ready")),
                ],
            ),
    );
    let mut controller = controller(&api);

    controller.start_upload(file("clip.mp4")).await;
    let settled = controller.wait_until_settled().await;

    assert_eq!(settled.phase, Phase::Interrupted);
    assert_eq!(settled.error, None);
    assert_eq!(settled.result.unwrap().status.state, "inprogress");

    time::sleep(INTERVAL * 10).await;
    assert_eq!(api.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn upload_error_is_shown_and_nothing_is_polled() {
    let api = Arc::new(ScriptedApi::default());
    let mut controller = controller(&api);

    let snapshot = controller.start_upload(file("rejected.mp4")).await;
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.result.is_none());
    assert!(
        snapshot
            .message()
            .unwrap()
            .contains("Storage capacity exceeded")
    );

    time::sleep(INTERVAL * 3).await;
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn new_upload_clears_previous_error() {
    let api = Arc::new(ScriptedApi::default().on_upload("clip.mp4", video("vid-1", "ready")));
    let mut controller = controller(&api);

    let failed = controller.start_upload(file("rejected.mp4")).await;
    assert!(failed.error.is_some());

    let snapshot = controller.start_upload(file("clip.mp4")).await;
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.phase, Phase::Ready);
    assert!(snapshot.generation > failed.generation);
}

#[tokio::test(start_paused = true)]
async fn missing_file_is_a_no_op() {
    let api = Arc::new(ScriptedApi::default());
    let mut controller = controller(&api);

    let snapshot = controller.start_upload(None).await;
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(snapshot.generation, 0);
    assert!(snapshot.message().is_none());
}

#[tokio::test(start_paused = true)]
async fn ready_on_upload_skips_polling() {
    let api = Arc::new(ScriptedApi::default().on_upload("clip.mp4", video("vid-1", "ready")));
    let mut controller = controller(&api);

    let snapshot = controller.start_upload(file("clip.mp4")).await;
    assert_eq!(snapshot.phase, Phase::Ready);

    time::sleep(INTERVAL * 3).await;
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reset_and_drop_cancel_polling() {
    let api = Arc::new(
        ScriptedApi::default()
            .on_upload("clip.mp4", video("vid-1", "queued"))
            .on_status("vid-1", vec![Step::Status(video("vid-1", "inprogress"))]),
    );

    let mut controller = controller(&api);
    controller.start_upload(file("clip.mp4")).await;
    controller.reset();
    assert_eq!(controller.snapshot().phase, Phase::Idle);
    assert!(controller.snapshot().result.is_none());

    time::sleep(INTERVAL * 3).await;
    assert!(api.calls().is_empty());

    controller.start_upload(file("clip.mp4")).await;
    drop(controller);

    time::sleep(INTERVAL * 3).await;
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn response_in_flight_during_restart_is_discarded() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(
        ScriptedApi::default()
            .on_upload("first.mp4", video("first", "queued"))
            .on_upload("second.mp4", video("second", "queued"))
            .on_status(
                "first",
                vec![Step::Held(gate.clone(), video("first", "ready"))],
            )
            .on_status(
                "second",
                vec![
                    Step::Status(video("second", "inprogress")),
                    Step::Status(video("second", "ready")),
                ],
            ),
    );
    let mut controller = controller(&api);
    let mut updates = controller.subscribe();

    controller.start_upload(file("first.mp4")).await;
    time::sleep(INTERVAL + Duration::from_secs(1)).await;
    assert_eq!(api.calls_for("first").len(), 1, "first status request is pending");

    controller.start_upload(file("second.mp4")).await;
    gate.notify_waiters();
    let settled = controller.wait_until_settled().await;
    assert_eq!(settled.phase, Phase::Ready);
    assert_eq!(settled.result.as_ref().unwrap().uid, "second");

    time::sleep(INTERVAL * 3).await;
    let last = updates.borrow_and_update().clone();
    assert_eq!(last, settled);
    assert_eq!(api.calls_for("first").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_raised_to_the_minimum() {
    let api = Arc::new(
        ScriptedApi::default()
            .on_upload("clip.mp4", video("vid-1", "queued"))
            .on_status("vid-1", vec![Step::Status(video("vid-1", "ready"))]),
    );
    let mut controller = UploadController::new(api.clone()).with_interval(Duration::ZERO);

    let started = Instant::now();
    controller.start_upload(file("clip.mp4")).await;
    let settled = time::timeout(INTERVAL, controller.wait_until_settled())
        .await
        .expect("polling should settle");

    assert_eq!(settled.phase, Phase::Ready);
    let calls = api.calls_for("vid-1");
    assert_eq!(calls.len(), 1);
    assert!(calls[0] - started >= MIN_POLL_INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn crashed_poller_interrupts_instead_of_hanging() {
    let api = Arc::new(
        ScriptedApi::default()
            .on_upload("clip.mp4", video("vid-1", "queued"))
            .on_status("vid-1", vec![Step::Crash]),
    );
    let mut controller = controller(&api);

    controller.start_upload(file("clip.mp4")).await;
    let settled = time::timeout(INTERVAL * 3, controller.wait_until_settled())
        .await
        .expect("a crashed poller must not leave the controller polling");

    assert_eq!(settled.phase, Phase::Interrupted);
    assert_eq!(settled.result.unwrap().status.state, "queued");
}
