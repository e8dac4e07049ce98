use chrono::{DateTime, Local};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SourceConfig;
use crate::pose::landmarks::{HandPose, Landmark, PoseError, PoseFrame};

pub type PoseResult = Result<PoseFrame, SourceError>;

// Upstream capture failures, fatal to the session
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to open pose source {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Failed to read pose stream: {0}")]
    Read(String),
}

// One JSON line as produced by the landmark detector bridge
#[derive(Debug, Deserialize)]
struct PoseRecord {
    #[serde(default)]
    timestamp: Option<DateTime<Local>>,
    #[serde(default)]
    hand: Option<HandRecord>,
}

#[derive(Debug, Deserialize)]
struct HandRecord {
    landmarks: Vec<Vec<f32>>,
    width: u32,
    height: u32,
    #[serde(default)]
    normalized: bool,
}

impl HandRecord {
    fn into_pose(self) -> Result<HandPose, PoseError> {
        let landmarks = self
            .landmarks
            .iter()
            .enumerate()
            .map(|(index, coords)| match coords.as_slice() {
                [x, y] => Ok(Landmark::new(*x, *y)),
                [x, y, z] => Ok(Landmark {
                    x: *x,
                    y: *y,
                    z: Some(*z),
                }),
                _ => Err(PoseError::CoordinateArity {
                    index,
                    arity: coords.len(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.normalized {
            HandPose::from_normalized(landmarks, self.width, self.height)
        } else {
            HandPose::new(landmarks, self.width, self.height)
        }
    }
}

/// Parses one JSON pose record. Records without a timestamp get `received`.
pub fn parse_pose_line(line: &str, received: DateTime<Local>) -> Result<PoseFrame, PoseError> {
    let record: PoseRecord =
        serde_json::from_str(line).map_err(|e| PoseError::Parse(e.to_string()))?;
    let timestamp = record.timestamp.unwrap_or(received);
    let hand = record.hand.map(HandRecord::into_pose).transpose()?;
    Ok(PoseFrame::new(timestamp, hand))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderStats {
    pub lines: usize,
    pub frames: usize,
    pub malformed: usize,
}

/// Reads JSON-lines pose records until end of stream or cancellation.
///
/// Malformed records are forwarded as absent poses so the pipeline still ticks.
pub async fn read_poses<R: AsyncRead + Unpin>(
    reader: R,
    sender: &mpsc::Sender<PoseResult>,
    cancel: &CancellationToken,
) -> Result<ReaderStats, SourceError> {
    let mut lines = BufReader::new(reader).lines();
    let mut stats = ReaderStats::default();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Pose reader cancelled");
                break;
            }
            line = lines.next_line() => line.map_err(|e| SourceError::Read(e.to_string()))?,
        };

        let Some(line) = line else {
            info!("Pose stream ended after {} lines", stats.lines);
            break;
        };
        stats.lines += 1;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let received = Local::now();
        let frame = match parse_pose_line(line, received) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Treating malformed pose record {} as absent: {}", stats.lines, e);
                stats.malformed += 1;
                PoseFrame::absent(received)
            }
        };

        if sender.send(Ok(frame)).await.is_err() {
            debug!("Pose receiver dropped, stopping reader");
            break;
        }
        stats.frames += 1;
    }

    Ok(stats)
}

// Public interface for spawning the reader
pub struct PoseReaderHandle {
    task_handle: JoinHandle<()>,
}

impl PoseReaderHandle {
    /// Spawns the reader on the configured file, or stdin when no path is set.
    ///
    /// Open and read failures are sent down the channel as `Err` so the session
    /// ends with the upstream error.
    pub fn spawn(
        config: &SourceConfig,
        sender: mpsc::Sender<PoseResult>,
        cancel: CancellationToken,
    ) -> Self {
        let path = config.path.clone();
        info!(
            "Spawning pose reader on {}",
            path.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stdin".to_string())
        );

        let task_handle = tokio::spawn(async move {
            let result = match path {
                Some(path) => match tokio::fs::File::open(&path).await {
                    Ok(file) => read_poses(file, &sender, &cancel).await,
                    Err(e) => Err(SourceError::Open {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    }),
                },
                None => read_poses(tokio::io::stdin(), &sender, &cancel).await,
            };

            match result {
                Ok(stats) => info!(
                    "Pose reader finished: {} lines, {} frames, {} malformed",
                    stats.lines, stats.frames, stats.malformed
                ),
                Err(e) => {
                    error!("Pose source failed: {}", e);
                    let _ = sender.send(Err(e)).await;
                }
            }
        });

        Self { task_handle }
    }

    pub fn is_finished(&self) -> bool {
        self.task_handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::landmarks::{LANDMARK_COUNT, THUMB_TIP};

    fn hand_json(normalized: bool) -> String {
        let value = if normalized { 0.5 } else { 100.0 };
        let points: Vec<String> = (0..LANDMARK_COUNT)
            .map(|_| format!("[{value}, {value}]"))
            .collect();
        format!(
            r#"{{"hand": {{"landmarks": [{}], "width": 640, "height": 480, "normalized": {normalized}}}}}"#,
            points.join(",")
        )
    }

    #[test]
    fn test_parse_pixel_hand() {
        let now = Local::now();
        let frame = parse_pose_line(&hand_json(false), now).unwrap();
        assert_eq!(frame.timestamp, now);
        let hand = frame.hand.unwrap();
        assert_eq!(hand.landmark(THUMB_TIP), &Landmark::new(100.0, 100.0));
        assert_eq!(hand.dimensions(), (640, 480));
    }

    #[test]
    fn test_parse_normalized_hand() {
        let frame = parse_pose_line(&hand_json(true), Local::now()).unwrap();
        let hand = frame.hand.unwrap();
        assert_eq!(hand.landmark(0), &Landmark::new(320.0, 240.0));
    }

    #[test]
    fn test_parse_absent_hand_with_timestamp() {
        let frame =
            parse_pose_line(r#"{"timestamp": "2024-05-01T10:00:00+00:00", "hand": null}"#, Local::now())
                .unwrap();
        assert!(frame.hand.is_none());
        assert_eq!(frame.timestamp.timestamp(), 1_714_557_600);
    }

    #[test]
    fn test_parse_rejects_bad_arity() {
        let line = r#"{"hand": {"landmarks": [[1.0]], "width": 640, "height": 480}}"#;
        assert_eq!(
            parse_pose_line(line, Local::now()),
            Err(PoseError::CoordinateArity { index: 0, arity: 1 })
        );
    }

    #[tokio::test]
    async fn test_reader_forwards_frames_and_malformed_as_absent() {
        let input = format!("{}\n\nnot json\n{{\"hand\": null}}\n", hand_json(false));
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let stats = read_poses(input.as_bytes(), &tx, &cancel).await.unwrap();
        assert_eq!(
            stats,
            ReaderStats {
                lines: 4,
                frames: 3,
                malformed: 1
            }
        );

        let first = rx.recv().await.unwrap().unwrap();
        assert!(first.hand.is_some());
        let second = rx.recv().await.unwrap().unwrap();
        assert!(second.hand.is_none());
        let third = rx.recv().await.unwrap().unwrap();
        assert!(third.hand.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_reports_source_error() {
        let config = SourceConfig {
            path: Some("/nonexistent/ghosttouch/poses.jsonl".into()),
            ..Default::default()
        };
        let (tx, mut rx) = mpsc::channel(1);
        let _handle = PoseReaderHandle::spawn(&config, tx, CancellationToken::new());

        let result = rx.recv().await.unwrap();
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }
}
