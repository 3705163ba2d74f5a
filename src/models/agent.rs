use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    common::{KinematicState, Vector3},
    interceptor::Interceptor,
    threat::Threat,
    traits::IPhaseBehavior,
};
use crate::scenario::{AgentConfig, DynamicConfig, StaticConfig};

/// エージェント識別子
///
/// ロスター内で一意。ID順の走査が生成順と一致します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// フライトフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightPhase {
    /// 生成直後
    Initialized,
    /// 発射待機
    Ready,
    /// ブースト（推力加速）
    Boost,
    /// 中間誘導
    Midcourse,
    /// 終末誘導
    Terminal,
    /// 終了（吸収状態）
    Terminated,
}

impl FlightPhase {
    /// 発射済みかどうか（BOOST 以降）
    pub fn has_launched(&self) -> bool {
        !matches!(self, FlightPhase::Initialized | FlightPhase::Ready)
    }

    /// `next` への遷移が許可されているか
    ///
    /// 同一フェーズへの遷移は常に許可（無操作）。TERMINATED からは抜けられず、
    /// 発射後に READY / BOOST へ戻ることはありません。
    pub fn can_transition_to(&self, next: FlightPhase) -> bool {
        use FlightPhase::*;
        if *self == next {
            return true;
        }
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Initialized, Ready) => true,
            (Ready, Boost) => true,
            (Boost, Midcourse | Terminal) => true,
            (Midcourse, Terminal) | (Terminal, Midcourse) => true,
            _ => false,
        }
    }
}

/// フェーズ遷移エラー
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PhaseError {
    #[error("不正なフライトフェーズ遷移です: {agent} {from:?} -> {to:?}")]
    IllegalTransition {
        agent: AgentId,
        from: FlightPhase,
        to: FlightPhase,
    },
}

/// 追尾目標のスナップショット
///
/// ティック処理中に他エージェントを借用しないよう、目標の状態をコピーして渡します。
#[derive(Debug, Clone, Copy)]
pub struct TargetView {
    pub id: AgentId,
    pub state: KinematicState,
}

/// 1ティック分の処理文脈
#[derive(Debug, Clone, Copy)]
pub struct TickContext {
    pub dt: f64,
    /// シミュレーション時刻（s）
    pub sim_time: f64,
    /// 割り当て済み目標（未割り当てまたは消失時は None）
    pub target: Option<TargetView>,
    /// 防護対象地点
    pub defended_point: Vector3,
    /// ミス判定距離（m）
    pub miss_range: f64,
}

/// フェーズ処理から上位へ返す処理要求
#[derive(Debug, Clone)]
pub enum AgentAction {
    /// 目標を見失った（ミス宣言）
    DeclareMiss { target: Option<AgentId>, range: f64 },
    /// 子弾の放出
    SpawnSubmunitions {
        count: u32,
        config: Box<AgentConfig>,
        state: KinematicState,
    },
}

/// 全エージェント共通の状態
#[derive(Debug, Clone)]
pub struct AgentCore {
    pub id: AgentId,
    pub name: String,
    pub state: KinematicState,
    pub static_config: StaticConfig,
    pub dynamic_config: DynamicConfig,
    /// 今ティックの要求加速度（重力・抗力込み）
    pub acceleration: Vector3,
    /// 誘導・推力による加速度指令
    pub acceleration_command: Vector3,
    /// 抗力加速度
    pub drag_acceleration: Vector3,
    flight_phase: FlightPhase,
    elapsed_time: f64,
    phase_elapsed: f64,
    target: Option<AgentId>,
    is_hit: bool,
    is_miss: bool,
    active: bool,
}

impl AgentCore {
    pub fn new(
        id: AgentId,
        name: String,
        state: KinematicState,
        static_config: StaticConfig,
        dynamic_config: DynamicConfig,
    ) -> Self {
        Self {
            id,
            name,
            state,
            static_config,
            dynamic_config,
            acceleration: Vector3::ZERO,
            acceleration_command: Vector3::ZERO,
            drag_acceleration: Vector3::ZERO,
            flight_phase: FlightPhase::Initialized,
            elapsed_time: 0.0,
            phase_elapsed: 0.0,
            target: None,
            is_hit: false,
            is_miss: false,
            active: true,
        }
    }

    pub fn flight_phase(&self) -> FlightPhase {
        self.flight_phase
    }

    /// 開始からの経過時間（s）
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    /// 現在フェーズに入ってからの経過時間（s）
    pub fn phase_elapsed(&self) -> f64 {
        self.phase_elapsed
    }

    /// フライトフェーズの変更
    ///
    /// 許可された遷移のみ受け付け、フェーズが変わった場合はフェーズタイマーをリセットします。
    ///
    /// # 戻り値
    ///
    /// 不正な遷移の場合は `PhaseError::IllegalTransition`
    pub fn set_flight_phase(&mut self, next: FlightPhase) -> Result<(), PhaseError> {
        if !self.flight_phase.can_transition_to(next) {
            return Err(PhaseError::IllegalTransition {
                agent: self.id,
                from: self.flight_phase,
                to: next,
            });
        }
        if self.flight_phase != next {
            debug!(
                agent_id = %self.id,
                agent_name = %self.name,
                from = ?self.flight_phase,
                to = ?next,
                elapsed = self.elapsed_time,
                "PHASE_TRANSITION: フライトフェーズが遷移しました"
            );
            self.flight_phase = next;
            self.phase_elapsed = 0.0;
        }
        Ok(())
    }

    pub fn has_launched(&self) -> bool {
        self.flight_phase.has_launched()
    }

    pub fn has_terminated(&self) -> bool {
        self.flight_phase == FlightPhase::Terminated
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_hit(&self) -> bool {
        self.is_hit
    }

    pub fn is_miss(&self) -> bool {
        self.is_miss
    }

    pub fn target(&self) -> Option<AgentId> {
        self.target
    }

    pub fn has_assigned_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn assign_target(&mut self, target: AgentId) {
        self.target = Some(target);
    }

    pub fn unassign_target(&mut self) {
        self.target = None;
    }

    pub fn speed(&self) -> f64 {
        self.state.speed()
    }

    /// 終了処理
    ///
    /// 位置・速度を原点に戻して非アクティブ化します。何度呼んでも結果は同じです。
    pub fn terminate(&mut self) {
        self.flight_phase = FlightPhase::Terminated;
        self.state.position = Vector3::ZERO;
        self.state.velocity = Vector3::ZERO;
        self.acceleration = Vector3::ZERO;
        self.acceleration_command = Vector3::ZERO;
        self.drag_acceleration = Vector3::ZERO;
        self.active = false;
    }

    /// 命中として終了
    pub fn mark_as_hit(&mut self) {
        self.is_hit = true;
        self.terminate();
    }

    /// ミスとして終了
    pub fn mark_as_miss(&mut self) {
        self.is_miss = true;
        self.terminate();
    }

    /// 時刻に基づくフェーズ遷移の評価
    ///
    /// READY は発射時刻到達で BOOST へ、BOOST はブースト時間経過後に MIDCOURSE へ。
    fn evaluate_timed_transitions(&mut self) -> Result<(), PhaseError> {
        let launch_time = self.dynamic_config.launch_config.launch_time;
        let boost_end = launch_time + self.static_config.boost_config.boost_time;

        if self.flight_phase == FlightPhase::Ready && self.elapsed_time >= launch_time {
            self.set_flight_phase(FlightPhase::Boost)?;
        }
        if self.flight_phase == FlightPhase::Boost && self.elapsed_time > boost_end {
            self.set_flight_phase(FlightPhase::Midcourse)?;
        }
        Ok(())
    }
}

/// エージェント種別ごとの振る舞い
#[derive(Debug, Clone)]
pub enum AgentKind {
    Interceptor(Interceptor),
    Threat(Threat),
}

impl IPhaseBehavior for AgentKind {
    fn update_ready(&mut self, core: &mut AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>) {
        match self {
            AgentKind::Interceptor(interceptor) => interceptor.update_ready(core, ctx, actions),
            AgentKind::Threat(threat) => threat.update_ready(core, ctx, actions),
        }
    }

    fn update_boost(&mut self, core: &mut AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>) {
        match self {
            AgentKind::Interceptor(interceptor) => interceptor.update_boost(core, ctx, actions),
            AgentKind::Threat(threat) => threat.update_boost(core, ctx, actions),
        }
    }

    fn update_midcourse(&mut self, core: &mut AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>) {
        match self {
            AgentKind::Interceptor(interceptor) => interceptor.update_midcourse(core, ctx, actions),
            AgentKind::Threat(threat) => threat.update_midcourse(core, ctx, actions),
        }
    }
}

/// シミュレーションエージェント（迎撃体または脅威）
#[derive(Debug, Clone)]
pub struct Agent {
    pub core: AgentCore,
    pub kind: AgentKind,
}

impl Agent {
    pub fn new(core: AgentCore, kind: AgentKind) -> Self {
        Self { core, kind }
    }

    pub fn id(&self) -> AgentId {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// 開始処理（READY へ遷移）
    pub fn start(&mut self) -> Result<(), PhaseError> {
        self.core.elapsed_time = 0.0;
        self.core.set_flight_phase(FlightPhase::Ready)?;
        info!(
            agent_id = %self.core.id,
            agent_name = %self.core.name,
            position = %self.core.state.position,
            launch_time = self.core.dynamic_config.launch_config.launch_time,
            "AGENT_READY: エージェントが待機状態になりました"
        );
        Ok(())
    }

    pub fn is_interceptor(&self) -> bool {
        matches!(self.kind, AgentKind::Interceptor(_))
    }

    pub fn is_threat(&self) -> bool {
        matches!(self.kind, AgentKind::Threat(_))
    }

    pub fn as_interceptor(&self) -> Option<&Interceptor> {
        match &self.kind {
            AgentKind::Interceptor(interceptor) => Some(interceptor),
            AgentKind::Threat(_) => None,
        }
    }

    pub fn as_threat(&self) -> Option<&Threat> {
        match &self.kind {
            AgentKind::Threat(threat) => Some(threat),
            AgentKind::Interceptor(_) => None,
        }
    }

    /// 割り当て可能か（未発射かつ未割り当ての迎撃体のみ）
    pub fn is_assignable(&self) -> bool {
        self.is_interceptor()
            && self.core.is_active()
            && !self.core.has_launched()
            && !self.core.has_assigned_target()
    }

    /// 目標が撃破・終了していれば割り当てを解除
    ///
    /// # 戻り値
    ///
    /// 割り当てを解除した場合は true
    pub fn check_target_hit(&mut self, target_terminated: bool) -> bool {
        if target_terminated && self.core.has_assigned_target() {
            debug!(
                agent_id = %self.core.id,
                target_id = ?self.core.target(),
                "TARGET_LOST: 目標が消失したため割り当てを解除します"
            );
            self.core.unassign_target();
            return true;
        }
        false
    }

    /// 1ティックの処理
    ///
    /// 経過時間を進めて時刻遷移を評価し、現在フェーズのハンドラを呼び出します。
    /// TERMINATED のエージェントは何もしません。
    pub fn tick(&mut self, ctx: &TickContext, actions: &mut Vec<AgentAction>) -> Result<(), PhaseError> {
        if self.core.has_terminated() {
            return Ok(());
        }

        self.core.elapsed_time += ctx.dt;
        self.core.phase_elapsed += ctx.dt;
        self.core.evaluate_timed_transitions()?;

        match self.core.flight_phase {
            FlightPhase::Initialized | FlightPhase::Terminated => {}
            FlightPhase::Ready => self.kind.update_ready(&mut self.core, ctx, actions),
            FlightPhase::Boost => self.kind.update_boost(&mut self.core, ctx, actions),
            FlightPhase::Midcourse | FlightPhase::Terminal => {
                self.kind.update_midcourse(&mut self.core, ctx, actions)
            }
        }
        Ok(())
    }
}
