use anyhow::{bail, Context, Result};
use futures::future::{ready, FutureExt};
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use pose_measure::config::Config;
use pose_measure::mask::SegMask;
use pose_measure::pose::{FrameSize, Landmark, LandmarkSet, PoseFrame};
use pose_measure::provider::{MaskFuture, MaskProvider, MaskSlot};
use pose_measure::session::{Session, SessionEvent};

const CONFIG_PATH: &str = "config.toml";

/// 再生レート
const REPLAY_FPS: f64 = 30.0;

/// 確率マスクを2値化する閾値
const MASK_THRESHOLD: f32 = 0.5;

/// JSON Lines の1行
#[derive(Debug, Deserialize)]
struct FrameRecord {
    /// 秒
    t: f64,
    width: u32,
    height: u32,
    /// [x, y, z, visibility]（x, y は 0〜1 正規化）
    landmarks: Vec<Option<[f32; 4]>>,
    #[serde(default)]
    mask: Option<MaskRecord>,
}

/// '0'/'1' の行、またはセグメンテーションの確率（行優先）で表したマスク
#[derive(Debug, Clone, Deserialize)]
struct MaskRecord {
    width: usize,
    height: usize,
    #[serde(default)]
    rows: Vec<String>,
    #[serde(default)]
    probabilities: Vec<f32>,
}

impl MaskRecord {
    fn decode(&self) -> Option<SegMask> {
        if !self.probabilities.is_empty() {
            return SegMask::from_probabilities(self.width, self.height, &self.probabilities, MASK_THRESHOLD);
        }
        if self.rows.len() != self.height {
            return None;
        }
        let mut cells = Vec::with_capacity(self.width * self.height);
        for row in &self.rows {
            if row.len() != self.width {
                return None;
            }
            cells.extend(row.bytes().map(|b| b == b'1'));
        }
        SegMask::new(self.width, self.height, cells)
    }
}

impl FrameRecord {
    fn into_parts(self) -> (PoseFrame, Option<MaskRecord>) {
        let landmarks: Vec<Option<Landmark>> = self
            .landmarks
            .into_iter()
            .map(|lm| lm.map(|[x, y, z, v]| Landmark::new_3d(x, y, z, v)))
            .collect();
        let frame = PoseFrame::new(self.t, LandmarkSet::from_slice(&landmarks), FrameSize::new(self.width, self.height));
        (frame, self.mask)
    }
}

struct ReplayFrame {
    pose: PoseFrame,
    mask: Option<MaskRecord>,
}

fn read_frames(path: &str) -> Result<Vec<ReplayFrame>> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            let record: FrameRecord =
                serde_json::from_str(line).with_context(|| format!("{}:{}: invalid frame record", path, i + 1))?;
            let (pose, mask) = record.into_parts();
            Ok(ReplayFrame { pose, mask })
        })
        .collect()
}

/// デコードはブロッキングスレッドで行い、完了はスロット側で拾う
struct BlockingDecoder;

impl MaskProvider<ReplayFrame> for BlockingDecoder {
    fn request_mask(&mut self, frame: &ReplayFrame) -> MaskFuture {
        match frame.mask.clone() {
            Some(record) => tokio::task::spawn_blocking(move || record.decode())
                .map(|joined| joined.ok().flatten())
                .boxed(),
            None => ready(None).boxed(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let fast = args.iter().any(|a| a == "--fast");
    let positional: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with("--")).collect();
    let Some(frames_path) = positional.first() else {
        bail!("usage: {} <frames.jsonl> [config.toml] [--fast]", args[0]);
    };
    let config_path = positional.get(1).map(|s| s.as_str()).unwrap_or(CONFIG_PATH);

    let config = Config::load_or_default(config_path);
    let frames = read_frames(frames_path)?;
    info!("replaying {} frames from {}", frames.len(), frames_path);

    let mut session = Session::new(config);
    let mut masks = BlockingDecoder;
    let mut slot = MaskSlot::new();
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / REPLAY_FPS));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    for frame in frames {
        if fast {
            tokio::task::yield_now().await;
        } else {
            interval.tick().await;
        }
        slot.request(masks.request_mask(&frame));
        let events = session.on_frame(&frame.pose, slot.poll());
        for event in events {
            match event {
                SessionEvent::StepChanged(step) => info!("step: {} ({})", step, session.guidance()),
                SessionEvent::Completed(_) => info!("measurement complete"),
            }
        }
        if session.is_complete() {
            break;
        }
    }

    let output = match session.result() {
        Some(result) => serde_json::to_string_pretty(result)?,
        None => {
            warn!(
                "session ended at {} ({:.0}%), printing partial result",
                session.current_step(),
                session.session_progress() * 100.0
            );
            serde_json::to_string_pretty(session.partial_result())?
        }
    };
    println!("{}", output);

    Ok(())
}
