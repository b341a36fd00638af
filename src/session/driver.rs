use std::collections::HashMap;

use log::{debug, info};

use super::calibration::{CalibrationScale, ScaleUpdate};
use super::hold::{HoldGate, HoldStatus};
use super::motion::MotionWindow;
use super::range::RangeTracker;
use super::reps::RepCounter;
use super::result::{merge_snapshots, MeasureResult, StepSnapshot};
use super::step::{default_steps, Gate, GateInput, StepDescriptor, StepId, STRAIGHT_KNEE_MIN_DEG};
use crate::config::Config;
use crate::filter::{Ema, LandmarkFilter, MedianBuffer, SmoothingKernel7};
use crate::mask::{circumference_cm, row_width_px, Outline, OutlineTracker, SegMask};
use crate::metrics::{coverage, Coverage, CoverageClass, MetricId, MetricInput, Signal, View, METRICS};
use crate::pose::PoseFrame;

/// 胸囲を測る行（肩→股関節の比率）
const CHEST_ROW: f32 = 0.25;
/// 胴囲を測る行（肩→股関節の比率）
const WAIST_ROW: f32 = 0.65;

/// 呼び出し側へ通知するイベント
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StepChanged(StepId),
    /// Done到達時に一度だけ
    Completed(MeasureResult),
}

/// 直近フレームで起きた非致命的な棄却
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// 必要なランドマークやマスクがない
    MissingInput,
    CalibrationRejected,
    /// 保持中の動きが大きすぎた
    StabilityViolation,
    /// 確定済みのステップを再確定しようとした
    ReentrantCommit,
}

/// メディアン → EMA の2段平滑化
#[derive(Debug, Clone)]
struct LiveMetric {
    median: MedianBuffer,
    ema: Ema,
}

impl LiveMetric {
    fn new(config: &Config) -> Self {
        Self {
            median: MedianBuffer::new(config.filter.median_window),
            ema: Ema::new(config.filter.ema_alpha),
        }
    }

    fn update(&mut self, value: f32) -> Option<f32> {
        self.median.push(value);
        self.ema.update(self.median.median())
    }

    fn value(&self) -> Option<f32> {
        self.ema.value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Girth {
    Chest,
    Waist,
    Hip,
}

/// 計測セッション
///
/// フレームごとに`on_frame`を呼ぶ。ステップの確定はそのフレームで
/// スナップショットを取り、遷移（インデックス更新とイベント）は次の
/// `tick`/`on_frame`で適用する。
pub struct Session {
    config: Config,
    steps: Vec<StepDescriptor>,
    index: usize,
    step_started: Option<f64>,
    last_time: Option<f64>,
    /// 確定済みで遷移待ち
    pending: bool,
    /// 現在のステップが確定済み
    committed: bool,
    completed: bool,
    cooldown_until: f64,

    landmark_filter: LandmarkFilter,
    calibration: CalibrationScale,
    hold: HoldGate,
    reps: Option<RepCounter>,
    rep_kernel: SmoothingKernel7,
    range: RangeTracker,
    windows: HashMap<Signal, MotionWindow>,

    live: HashMap<MetricId, LiveMetric>,
    girths: HashMap<Girth, LiveMetric>,
    coverage: Option<Coverage>,
    outline: OutlineTracker,
    last_outline: Option<Outline>,

    snapshots: Vec<StepSnapshot>,
    partial: MeasureResult,
    result: Option<MeasureResult>,

    guidance: &'static str,
    step_progress: f32,
    last_rejection: Option<Rejection>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let steps = default_steps(&config);
        Self::with_steps(config, steps)
    }

    pub fn with_steps(config: Config, steps: Vec<StepDescriptor>) -> Self {
        let threshold = config.session.visibility_threshold;
        let guidance = steps.first().map(|s| s.guidance).unwrap_or("");
        let reps = match steps.first().map(|s| s.gate) {
            Some(Gate::Reps { thresholds, .. }) => Some(RepCounter::new(thresholds)),
            _ => None,
        };
        Self {
            landmark_filter: LandmarkFilter::new(&config.filter, threshold),
            calibration: CalibrationScale::new(config.session.known_height_cm, config.calibration.clone()),
            hold: HoldGate::new(&config.hold),
            outline: OutlineTracker::new(config.contour.clone()),
            completed: steps.is_empty(),
            steps,
            index: 0,
            step_started: None,
            last_time: None,
            pending: false,
            committed: false,
            cooldown_until: f64::NEG_INFINITY,
            reps,
            rep_kernel: SmoothingKernel7::new(),
            range: RangeTracker::new(),
            windows: HashMap::new(),
            live: HashMap::new(),
            girths: HashMap::new(),
            coverage: None,
            last_outline: None,
            snapshots: Vec::new(),
            partial: MeasureResult::default(),
            result: None,
            guidance,
            step_progress: 0.0,
            last_rejection: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_step(&self) -> StepId {
        self.steps.get(self.index).map(|s| s.id).unwrap_or(StepId::Done)
    }

    pub fn step_index(&self) -> usize {
        self.index
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// 現在のステップの保持・反復の進み具合 (0.0〜1.0)。確定後とDoneでは1.0
    pub fn progress(&self) -> f32 {
        if self.completed || self.committed {
            return 1.0;
        }
        self.step_progress.clamp(0.0, 1.0)
    }

    /// ステップ列全体での進み具合 (0.0〜1.0)
    pub fn session_progress(&self) -> f32 {
        if self.completed || self.steps.is_empty() {
            return 1.0;
        }
        ((self.index as f32 + self.progress()) / self.steps.len() as f32).clamp(0.0, 1.0)
    }

    pub fn guidance(&self) -> &str {
        self.guidance
    }

    pub fn last_rejection(&self) -> Option<Rejection> {
        self.last_rejection
    }

    pub fn cm_per_px(&self) -> Option<f32> {
        self.calibration.value()
    }

    pub fn coverage(&self) -> Option<Coverage> {
        self.coverage
    }

    pub fn outline(&self) -> Option<&Outline> {
        self.last_outline.as_ref()
    }

    pub fn snapshots(&self) -> &[StepSnapshot] {
        &self.snapshots
    }

    /// 確定済みスナップショットのマージ
    pub fn partial_result(&self) -> &MeasureResult {
        &self.partial
    }

    /// Done到達後の最終結果
    pub fn result(&self) -> Option<&MeasureResult> {
        self.result.as_ref()
    }

    pub fn on_frame(&mut self, frame: &PoseFrame, mask: Option<&SegMask>) -> Vec<SessionEvent> {
        if self.completed {
            return Vec::new();
        }
        let now = frame.timestamp;
        if let Some(last) = self.last_time {
            if !(now > last) {
                debug!("dropping frame at {:.3}s (last {:.3}s)", now, last);
                return Vec::new();
            }
        }
        self.last_time = Some(now);

        let events = self.tick(now);
        if self.completed {
            return events;
        }
        self.step_started.get_or_insert(now);
        self.last_rejection = None;

        let threshold = self.config.session.visibility_threshold;
        let landmarks = self.landmark_filter.apply(&frame.landmarks, now);

        let unscaled = MetricInput::new(&landmarks, frame.frame, threshold, None);
        if self.is_upright(&unscaled) {
            if let Some(candidate) = self.calibration.candidate(&landmarks, frame.frame, threshold) {
                if let ScaleUpdate::Rejected { candidate, current } = self.calibration.propose(candidate) {
                    debug!("scale candidate {:.4} rejected (current {:.4})", candidate, current);
                    self.last_rejection = Some(Rejection::CalibrationRejected);
                }
            }
        }

        let input = MetricInput::new(&landmarks, frame.frame, threshold, self.calibration.value());
        let cov = coverage(&landmarks, threshold);
        let view = input.view();
        self.coverage = Some(cov);

        for spec in METRICS {
            if let Some(value) = spec.evaluate(&input, view) {
                let config = &self.config;
                self.live.entry(spec.id).or_insert_with(|| LiveMetric::new(config)).update(value);
            }
        }
        self.update_girths(mask, &input, view);

        let window_secs = self.config.session.motion_window_secs;
        for signal in Signal::ALL {
            if let Some(value) = signal.compute(&input) {
                self.windows
                    .entry(signal)
                    .or_insert_with(|| MotionWindow::new(window_secs))
                    .push(now, value);
            }
        }

        self.last_outline = self.outline.update(mask, &landmarks, frame.frame, threshold);

        if cov.class == CoverageClass::NoPerson {
            self.last_rejection = Some(Rejection::MissingInput);
        }
        self.evaluate_gate(&input, cov, view, now);
        events
    }

    /// 保留中の遷移を適用する
    pub fn tick(&mut self, now: f64) -> Vec<SessionEvent> {
        if !self.pending || self.completed {
            return Vec::new();
        }
        self.pending = false;
        self.enter(self.index + 1, now)
    }

    /// 現在のステップを強制確定して次へ進む（最短時間は無視）
    pub fn advance(&mut self) -> Vec<SessionEvent> {
        if self.completed {
            return Vec::new();
        }
        let now = self.last_time.unwrap_or(0.0);
        if !self.committed {
            if let Some(step) = self.steps.get(self.index).copied() {
                info!("manual advance from {}", step.id);
                self.commit(step, now);
            }
        }
        self.tick(now)
    }

    /// 前のステップに戻り、そのスナップショットを破棄する
    pub fn previous(&mut self) -> Vec<SessionEvent> {
        if self.completed {
            return Vec::new();
        }
        let now = self.last_time.unwrap_or(0.0);
        let mut events = self.tick(now);
        if self.completed || self.index == 0 {
            return events;
        }
        let target = self.index - 1;
        let id = self.steps[target].id;
        info!("manual return to {}", id);
        self.snapshots.retain(|s| s.step != id);
        self.partial = merge_snapshots(&self.snapshots);
        events.extend(self.enter(target, now));
        events
    }

    /// 最初からやり直す。設定とステップ列は維持
    pub fn reset(&mut self) {
        info!("session reset");
        let steps = std::mem::take(&mut self.steps);
        *self = Self::with_steps(self.config.clone(), steps);
    }

    /// 現在のフレームまでの平滑化済み計測値
    pub fn live_result(&self) -> MeasureResult {
        let mut result = MeasureResult {
            cm_per_px: self.calibration.value(),
            coverage: self.coverage.map(|c| c.score),
            ..Default::default()
        };
        for (id, metric) in &self.live {
            *result.metric_mut(*id) = metric.value();
        }
        let girth = |g: Girth| self.girths.get(&g).and_then(LiveMetric::value);
        result.circumferences.chest = girth(Girth::Chest);
        result.circumferences.waist = girth(Girth::Waist);
        result.circumferences.hip = girth(Girth::Hip);
        result
    }

    fn update_girths(&mut self, mask: Option<&SegMask>, input: &MetricInput, view: Option<View>) {
        let (Some(mask), Some(scale), Some(View::Frontal)) = (mask, input.cm_per_px, view) else {
            return;
        };
        let (Some(shoulders), Some(hips)) = (Signal::ShoulderCenterY.compute(input), Signal::HipCenterY.compute(input))
        else {
            return;
        };
        let span = hips - shoulders;
        if span <= 0.0 {
            return;
        }
        for (girth, row) in [
            (Girth::Chest, shoulders + CHEST_ROW * span),
            (Girth::Waist, shoulders + WAIST_ROW * span),
            (Girth::Hip, hips),
        ] {
            let width_px = row_width_px(mask, row, input.frame);
            if let Some(cm) = circumference_cm(width_px, scale) {
                let config = &self.config;
                self.girths.entry(girth).or_insert_with(|| LiveMetric::new(config)).update(cm);
            }
        }
    }

    /// 前屈・屈膝中は頭頂〜踵のスパンが縮むので候補にしない
    fn is_upright(&self, input: &MetricInput) -> bool {
        let trunk_ok = Signal::TrunkFlexion
            .compute(input)
            .map_or(true, |deg| deg <= self.config.calibration.max_trunk_lean_deg);
        let knees_ok = Signal::KneeFlexion.compute(input).map_or(true, |deg| deg >= STRAIGHT_KNEE_MIN_DEG);
        trunk_ok && knees_ok
    }

    fn is_still(&self) -> bool {
        let hold = &self.config.hold;
        let mut seen = false;
        for signal in Signal::POSITIONAL {
            if let Some(stats) = self.windows.get(&signal).and_then(MotionWindow::stats) {
                seen = true;
                if !stats.is_stable(hold.max_std, hold.max_peak_velocity) {
                    return false;
                }
            }
        }
        seen
    }

    fn evaluate_gate(&mut self, input: &MetricInput, cov: Coverage, view: Option<View>, now: f64) {
        let Some(step) = self.steps.get(self.index).copied() else {
            return;
        };
        if self.committed {
            self.last_rejection = Some(Rejection::ReentrantCommit);
            return;
        }
        if let Some(value) = step.rom.and_then(|signal| signal.compute(input)) {
            self.range.update(value);
        }

        match step.gate {
            Gate::Hold { predicate, stability } => {
                let gate_input = GateInput {
                    metrics: input,
                    coverage: cov,
                    view,
                    frame_margin: self.config.session.frame_margin,
                };
                let verdict = predicate(&gate_input);
                let cooling = now < self.cooldown_until;
                let still = !stability || self.is_still();
                let status = self.hold.update(verdict.is_ok() && !cooling, still, now);

                self.guidance = match verdict {
                    Err(hint) => hint,
                    Ok(()) if !still => {
                        self.last_rejection = Some(Rejection::StabilityViolation);
                        "Hold still"
                    }
                    Ok(()) => step.guidance,
                };
                self.step_progress = self.hold.progress(now);
                if status == HoldStatus::Complete {
                    self.try_commit(step, now);
                }
            }
            Gate::Reps { signal, .. } => {
                let Some(value) = signal.compute(input) else {
                    self.last_rejection = Some(Rejection::MissingInput);
                    self.guidance = "Keep your whole body in view";
                    return;
                };
                self.guidance = step.guidance;
                let smoothed = self.rep_kernel.update(value);
                let Some(counter) = self.reps.as_mut() else {
                    return;
                };
                if let Some(smoothed) = smoothed {
                    counter.update(now, smoothed);
                }
                self.step_progress = counter.progress();
                if counter.is_complete() {
                    self.try_commit(step, now);
                }
            }
        }
    }

    fn try_commit(&mut self, step: StepDescriptor, now: f64) {
        if self.committed {
            self.last_rejection = Some(Rejection::ReentrantCommit);
            return;
        }
        let started = self.step_started.unwrap_or(now);
        if now - started < step.min_duration {
            self.guidance = "Keep going a little longer";
            return;
        }
        self.commit(step, now);
    }

    fn commit(&mut self, step: StepDescriptor, now: f64) {
        let mut result = self.live_result();
        if let Some(signal) = step.rom {
            if let (Some(slot), Some(rom)) = (result.rom_mut(signal), self.range.rom()) {
                *slot = Some(rom);
            }
        }
        if let (Some(counter), Some(slot)) = (&self.reps, result.reps_mut(step.id)) {
            *slot = Some(counter.count() as f32);
        }
        result.completed_steps = vec![step.id];

        self.snapshots.retain(|s| s.step != step.id);
        self.snapshots.push(StepSnapshot { step: step.id, timestamp: now, result });
        self.snapshots.sort_by_key(|s| s.step);
        self.partial = merge_snapshots(&self.snapshots);

        self.clear_transient();
        self.committed = true;
        self.pending = true;
        self.step_progress = 1.0;
        self.cooldown_until = now + self.config.hold.cooldown_secs;
        info!("step {} committed at {:.2}s", step.id, now);
    }

    fn clear_transient(&mut self) {
        for window in self.windows.values_mut() {
            window.clear();
        }
        self.hold.reset();
        if let Some(counter) = self.reps.as_mut() {
            counter.reset();
        }
        self.rep_kernel.reset();
        self.range.reset();
    }

    fn enter(&mut self, index: usize, now: f64) -> Vec<SessionEvent> {
        self.index = index.min(self.steps.len());
        self.committed = false;
        self.step_started = Some(now);
        self.step_progress = 0.0;
        self.reps = match self.steps.get(self.index).map(|s| s.gate) {
            Some(Gate::Reps { thresholds, .. }) => Some(RepCounter::new(thresholds)),
            _ => None,
        };
        self.clear_transient();

        let id = self.current_step();
        info!("step -> {}", id);
        let mut events = vec![SessionEvent::StepChanged(id)];
        match self.steps.get(self.index) {
            Some(step) => self.guidance = step.guidance,
            None => {
                let result = merge_snapshots(&self.snapshots);
                info!("measurement complete ({} steps)", result.completed_steps.len());
                self.completed = true;
                self.guidance = "Measurement complete";
                self.result = Some(result.clone());
                events.push(SessionEvent::Completed(result));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{LandmarkSet, PoseFrame};
    use crate::testutil::{
        profile_pose, standing_pose, with_elbow_angle, with_knee_angle, with_neck_tilt, with_trunk_flexion, TEST_FRAME,
    };
    use std::f64::consts::PI;

    const FPS: f64 = 30.0;

    fn frame(t: f64, landmarks: LandmarkSet) -> PoseFrame {
        PoseFrame::new(t, landmarks, TEST_FRAME)
    }

    /// `seconds`秒分のフレームを流してイベントを集める
    fn run(session: &mut Session, from: f64, seconds: f64, pose: impl Fn(f64) -> LandmarkSet) -> Vec<SessionEvent> {
        let n = (seconds * FPS).round() as usize;
        let mut events = Vec::new();
        for i in 0..n {
            let t = from + i as f64 / FPS;
            events.extend(session.on_frame(&frame(t, pose(t)), None));
        }
        events
    }

    fn step_changes(events: &[SessionEvent]) -> Vec<StepId> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StepChanged(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn completions(events: &[SessionEvent]) -> usize {
        events.iter().filter(|e| matches!(e, SessionEvent::Completed(_))).count()
    }

    fn always(_: &GateInput) -> Result<(), &'static str> {
        Ok(())
    }

    fn instant_hold(id: StepId) -> StepDescriptor {
        StepDescriptor {
            id,
            gate: Gate::Hold { predicate: always, stability: false },
            rom: None,
            min_duration: 0.0,
            guidance: "hold",
        }
    }

    #[test]
    fn test_hold_commits_exactly_once() {
        let mut session = Session::new(Config::default());
        let events = run(&mut session, 0.0, 3.4, |_| standing_pose());

        assert_eq!(step_changes(&events), vec![StepId::ReferencePose]);
        assert_eq!(session.step_index(), 1);
        assert_eq!(session.snapshots().len(), 1);
        assert_eq!(session.snapshots()[0].step, StepId::FullFrame);

        let width = session.partial_result().lengths.shoulder_width.unwrap();
        assert!((width - 32.0).abs() < 0.05, "got {}", width);
        assert_eq!(session.partial_result().completed_steps, vec![StepId::FullFrame]);
    }

    #[test]
    fn test_flipping_predicate_never_commits() {
        let mut session = Session::new(Config::default());
        let mut events = Vec::new();
        for i in 0..180 {
            let t = i as f64 / FPS;
            // 毎秒1フレームだけ人物が消える
            let pose = if i % 30 == 15 { LandmarkSet::default() } else { standing_pose() };
            events.extend(session.on_frame(&frame(t, pose), None));
        }
        assert!(events.is_empty());
        assert_eq!(session.current_step(), StepId::FullFrame);
        assert!(session.snapshots().is_empty());
    }

    #[test]
    fn test_completion_fires_once() {
        let steps = vec![instant_hold(StepId::FullFrame), instant_hold(StepId::ReferencePose)];
        let mut session = Session::with_steps(Config::default(), steps);

        let events = run(&mut session, 0.0, 10.0, |_| standing_pose());
        assert_eq!(step_changes(&events), vec![StepId::ReferencePose, StepId::Done]);
        assert_eq!(completions(&events), 1);
        assert!(session.is_complete());
        assert_eq!(session.progress(), 1.0);

        let later = run(&mut session, 10.0, 2.0, |_| standing_pose());
        assert!(later.is_empty());
        assert!(session.advance().is_empty());

        let result = session.result().unwrap();
        assert_eq!(result.completed_steps, vec![StepId::FullFrame, StepId::ReferencePose]);
        assert!(result.cm_per_px.is_some());
    }

    #[test]
    fn test_squat_reps_capture_rom() {
        let mut config = Config::default();
        // 関節フィルタをほぼ素通しにする
        config.filter.min_cutoff = 30.0;
        let squat = default_steps(&config)[4];
        let mut session = Session::with_steps(config, vec![squat]);

        let events = run(&mut session, 0.0, 8.0, |t| {
            let angle = 135.0 + 45.0 * (t * PI).cos();
            with_knee_angle(&standing_pose(), angle as f32)
        });
        assert_eq!(completions(&events), 1);

        let result = session.result().unwrap();
        assert_eq!(result.reps.squat, Some(3.0));
        let rom = result.range_of_motion.knee_flexion.unwrap();
        assert!((rom - 90.0).abs() < 3.0, "rom {}", rom);
    }

    #[test]
    fn test_elbow_reps_fill_elbow_slots() {
        let mut config = Config::default();
        config.filter.min_cutoff = 30.0;
        let elbow = default_steps(&config)[5];
        assert_eq!(elbow.id, StepId::ElbowReps);
        let mut session = Session::with_steps(config, vec![elbow]);

        let events = run(&mut session, 0.0, 8.0, |t| {
            let angle = 115.0 + 55.0 * (t * PI).cos();
            with_elbow_angle(&standing_pose(), angle as f32)
        });
        assert_eq!(completions(&events), 1);

        let result = session.result().unwrap();
        assert_eq!(result.reps.elbow, Some(3.0));
        assert_eq!(result.reps.squat, None);
        let rom = result.range_of_motion.elbow_flexion.unwrap();
        assert!((rom - 110.0).abs() < 3.0, "rom {}", rom);
        assert_eq!(result.range_of_motion.knee_flexion, None);
        assert_eq!(result.completed_steps, vec![StepId::ElbowReps]);
    }

    #[test]
    fn test_neck_tilt_reps_fill_neck_slots() {
        let mut config = Config::default();
        config.filter.min_cutoff = 30.0;
        let neck = default_steps(&config)[7];
        assert_eq!(neck.id, StepId::NeckRom);
        let mut session = Session::with_steps(config, vec![neck]);

        let events = run(&mut session, 0.0, 6.0, |t| {
            let tilt = 25.0 * (t * PI).cos();
            with_neck_tilt(&standing_pose(), tilt as f32)
        });
        assert_eq!(completions(&events), 1);

        let result = session.result().unwrap();
        assert_eq!(result.reps.neck, Some(2.0));
        let rom = result.range_of_motion.neck_lateral_flexion.unwrap();
        assert!((rom - 50.0).abs() < 3.0, "rom {}", rom);
        assert_eq!(result.completed_steps, vec![StepId::NeckRom]);
    }

    #[test]
    fn test_progress_reports_active_hold() {
        let mut session = Session::new(Config::default());
        // 待機0.6秒 + 2秒保持のおよそ半分
        run(&mut session, 0.0, 1.7, |_| standing_pose());
        assert_eq!(session.current_step(), StepId::FullFrame);

        let progress = session.progress();
        assert!((progress - 0.5).abs() < 0.06, "progress {}", progress);
        let overall = session.session_progress();
        assert!((overall - progress / 8.0).abs() < 1e-6, "overall {}", overall);
    }

    #[test]
    fn test_forward_bend_keeps_scale() {
        let bend = default_steps(&Config::default())[3];
        let mut session = Session::with_steps(Config::default(), vec![bend]);

        run(&mut session, 0.0, 1.0, |_| profile_pose());
        let before = session.cm_per_px().unwrap();
        run(&mut session, 1.0, 1.5, |_| with_trunk_flexion(&profile_pose(), 70.0));
        let after = session.cm_per_px().unwrap();
        assert!((after / before - 1.0).abs() < 0.12, "before {} after {}", before, after);
    }

    #[test]
    fn test_minimum_duration_blocks_commit() {
        let mut slow = instant_hold(StepId::FullFrame);
        slow.min_duration = 5.0;
        let mut session = Session::with_steps(Config::default(), vec![slow]);

        let early = run(&mut session, 0.0, 4.0, |_| standing_pose());
        assert!(early.is_empty());
        assert_eq!(session.guidance(), "Keep going a little longer");

        let later = run(&mut session, 4.0, 1.5, |_| standing_pose());
        assert_eq!(completions(&later), 1);
    }

    #[test]
    fn test_manual_advance_and_previous() {
        let mut session = Session::new(Config::default());
        session.on_frame(&frame(0.0, standing_pose()), None);

        let events = session.advance();
        assert_eq!(step_changes(&events), vec![StepId::ReferencePose]);
        assert_eq!(session.snapshots().len(), 1);

        let events = session.previous();
        assert_eq!(step_changes(&events), vec![StepId::FullFrame]);
        assert!(session.snapshots().is_empty());
        assert_eq!(session.current_step(), StepId::FullFrame);

        // 先頭ではそれ以上戻らない
        assert!(session.previous().is_empty());
    }

    #[test]
    fn test_reset_restarts() {
        let mut session = Session::new(Config::default());
        session.on_frame(&frame(0.0, standing_pose()), None);
        session.advance();
        session.advance();
        assert_eq!(session.current_step(), StepId::SideProfile);

        session.reset();
        assert_eq!(session.current_step(), StepId::FullFrame);
        assert!(session.snapshots().is_empty());
        assert_eq!(session.progress(), 0.0);
        assert!(session.cm_per_px().is_none());
    }

    #[test]
    fn test_circumference_from_mask() {
        let mut session = Session::new(Config::default());
        // 幅20セル = 200px
        let mask = SegMask::from_fn(100, 100, |x, _| (40..60).contains(&x));
        session.on_frame(&frame(0.0, standing_pose()), Some(&mask));

        let live = session.live_result();
        let expected = 200.0 * 0.2 * std::f32::consts::PI;
        let chest = live.circumferences.chest.unwrap();
        assert!((chest - expected).abs() < 0.05, "got {}", chest);
        assert!(live.circumferences.waist.is_some() && live.circumferences.hip.is_some());
        assert_eq!(session.outline().map(|o| o.source), Some(crate::mask::OutlineSource::Mask));
    }

    #[test]
    fn test_no_circumference_without_mask() {
        let mut session = Session::new(Config::default());
        session.on_frame(&frame(0.0, standing_pose()), None);
        let live = session.live_result();
        assert!(live.circumferences.is_empty());
        assert!(live.lengths.shoulder_width.is_some());
    }

    #[test]
    fn test_out_of_order_frame_is_dropped() {
        let mut session = Session::new(Config::default());
        session.on_frame(&frame(1.0, standing_pose()), None);
        let before = session.live_result();
        session.on_frame(&frame(0.5, LandmarkSet::default()), None);
        assert_eq!(session.live_result(), before);
    }

    #[test]
    fn test_empty_frame_reports_missing_input() {
        let mut session = Session::new(Config::default());
        session.on_frame(&frame(0.0, LandmarkSet::default()), None);
        assert_eq!(session.last_rejection(), Some(Rejection::MissingInput));
        assert_eq!(session.guidance(), "Step back until your whole body is visible");
    }
}
