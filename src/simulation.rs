//! # Simulation モジュール
//!
//! 群対群の交戦シミュレーションを駆動するシミュレーションエンジンを提供します。
//!
//! `SimulationEngine` はシミュレーション文脈そのものです。エージェント名簿、
//! 脅威レジストリ（IADS）、生成ファクトリ、運動学プロバイダ、イベントバス、
//! 乱数生成器をすべて所有し、固定時間刻み（Δt）でティックを進めます。
//! グローバルな状態は持たず、各サブシステムには参照で渡します。
//!
//! ## ティック内の処理順序
//!
//! 1. **エージェント更新**: 目標消失の確認、フェーズタイマー更新と遷移評価、
//!    フェーズ別の処理（センサー・誘導）、運動学による積分
//! 2. **処理要求の回収**: ミス宣言と子弾放出要求を集める
//! 3. **衝突判定**: 近接した迎撃体と脅威に撃破確率を適用、地表到達の判定
//! 4. **イベント配信**: 脅威レジストリ → エージェント → 購読者の順
//! 5. **子弾生成**: 名簿へ追加し割り当て待ちキューへ登録
//! 6. **割り当て処理**: 割り当て待ちキューをティックごとに1回だけ処理
//!
//! 名簿の走査中に要素を追加・削除しないよう、ID一覧のコピーを走査し、
//! 追加は走査後にまとめて行います。
//!
//! ## 使用例
//!
//! ```ignore
//! use swarmsim::scenario::ScenarioConfig;
//! use swarmsim::simulation::SimulationEngine;
//!
//! let config = ScenarioConfig::from_file("scenarios/1_salvo_1_hydra_7_drones.yaml")?;
//! let mut engine = SimulationEngine::new(config, 1);
//! engine.initialize()?;
//! let summary = engine.run()?;
//! println!("撃破: {}", summary.tally.threats_destroyed());
//! ```

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, trace};

use crate::error::SimError;
use crate::events::{EngagementEvent, EngagementTally, EventBus, MissReason, SubscriptionId, TelemetryObserver};
use crate::models::{
    agent::{Agent, AgentAction, AgentId, TargetView, TickContext},
    common::{KinematicState, Vector3, math_utils},
    factory::AgentFactory,
    iads::Iads,
    kinematics::EulerKinematics,
    roster::Roster,
    threat::Threat,
    traits::{IAssignment, IEngagementObserver, IKinematics},
};
use crate::scenario::{AgentConfig, ScenarioConfig};

/// 実行終了の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 最大時間に到達
    TimeLimit,
    /// 最大ステップ数に到達
    StepLimit,
    /// 全迎撃体が終了
    AllInterceptorsTerminated,
}

/// 実行結果の要約
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub elapsed_time: f64,
    pub steps: u64,
    pub stop_reason: StopReason,
    pub tally: EngagementTally,
    /// 子弾を含む迎撃体数
    pub interceptors_total: usize,
    pub threats_total: usize,
    /// 終了時点で飛翔中の脅威
    pub threats_remaining: usize,
}

/// 子弾放出要求
struct SpawnRequest {
    carrier: AgentId,
    count: u32,
    config: Box<AgentConfig>,
    state: KinematicState,
}

pub struct SimulationEngine {
    pub current_time: f64,
    pub dt: f64,
    pub max_time: f64,
    pub max_steps: Option<u64>,
    pub seed: u64,
    pub step_count: u64,

    roster: Roster,
    iads: Iads,
    factory: AgentFactory,
    kinematics: Box<dyn IKinematics>,
    events: EventBus,
    tally: EngagementTally,
    rng: ChaCha8Rng,

    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        let dt = scenario.sim.dt_s;
        let max_time = scenario.sim.t_max_s;
        let seed = scenario.sim.seed;
        let policy = scenario.defense.assignment_policy.build(scenario.defense.defended_point);

        let mut events = EventBus::new();
        events.subscribe(Box::new(TelemetryObserver));

        Self {
            current_time: 0.0,
            dt,
            max_time,
            max_steps: scenario.sim.max_steps,
            seed,
            step_count: 0,
            roster: Roster::new(),
            iads: Iads::new(policy),
            factory: AgentFactory::new(scenario.resolved_static_models()),
            kinematics: Box::new(EulerKinematics::default()),
            events,
            tally: EngagementTally::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            scenario_config: scenario,
            verbose_level,
        }
    }

    /// 割り当てポリシーの差し替え
    pub fn set_assignment_policy(&mut self, policy: Box<dyn IAssignment>) {
        self.iads.set_policy(policy);
    }

    /// 運動学プロバイダの差し替え
    pub fn set_kinematics(&mut self, kinematics: Box<dyn IKinematics>) {
        self.kinematics = kinematics;
    }

    /// 交戦イベントの購読
    pub fn subscribe(&mut self, observer: Box<dyn IEngagementObserver>) -> SubscriptionId {
        self.events.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Option<Box<dyn IEngagementObserver>> {
        self.events.unsubscribe(id)
    }

    /// シナリオからエージェントを生成して初期状態にする
    ///
    /// 生成に失敗したエージェントはログに記録して飛ばし、残りで続行します。
    /// 最後に割り当て待ちキューを1回処理し、発射前の迎撃体に目標を割り当てます。
    pub fn initialize(&mut self) -> Result<(), SimError> {
        self.scenario_config.validate()?;

        if self.verbose_level > 0 {
            info!(
                scenario = %self.scenario_config.meta.name,
                policy = self.iads.policy_name(),
                "シミュレーションエンジンを初期化中..."
            );
        }

        self.current_time = 0.0;
        self.step_count = 0;
        self.roster.clear();
        self.iads.reset();
        self.tally = EngagementTally::default();
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.factory = AgentFactory::new(self.scenario_config.resolved_static_models());

        let interceptor_swarms = self.scenario_config.interceptor_swarms.clone();
        for (index, swarm) in interceptor_swarms.iter().enumerate() {
            for _ in 0..swarm.num_agents {
                if let Err(err) = self.spawn_interceptor(&swarm.agent_config) {
                    error!(swarm = index, error = %err, "AGENT_CREATION_FAILED: 迎撃体を生成できませんでした");
                }
            }
        }

        let threat_swarms = self.scenario_config.threat_swarms.clone();
        for (index, swarm) in threat_swarms.iter().enumerate() {
            for _ in 0..swarm.num_agents {
                if let Err(err) = self.spawn_threat(&swarm.agent_config) {
                    error!(swarm = index, error = %err, "AGENT_CREATION_FAILED: 脅威を生成できませんでした");
                }
            }
        }

        self.iads.flush(&mut self.roster);

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  迎撃体: {}発", self.roster.interceptors().count());
            info!("  脅威: {}機", self.roster.threats().count());
        }

        Ok(())
    }

    /// 迎撃体を1発生成して名簿に追加
    ///
    /// 誘導型の迎撃体は割り当て待ちキューに登録します。
    pub fn spawn_interceptor(&mut self, config: &AgentConfig) -> Result<AgentId, SimError> {
        let id = self.roster.allocate_id();
        let mut agent = self.factory.create_interceptor(id, config, &mut self.rng)?;
        agent.start()?;
        self.insert_interceptor(agent);
        Ok(id)
    }

    /// 脅威を1機生成して名簿と脅威表に追加
    pub fn spawn_threat(&mut self, config: &AgentConfig) -> Result<AgentId, SimError> {
        let id = self.roster.allocate_id();
        let mut agent = self.factory.create_threat(id, config, &mut self.rng)?;
        agent.start()?;
        self.iads.register_threat(id, agent.name());
        self.roster.insert(agent);
        Ok(id)
    }

    fn insert_interceptor(&mut self, agent: Agent) {
        let guided = agent.as_interceptor().is_some_and(|interceptor| interceptor.is_guided());
        let id = self.roster.insert(agent);
        if guided {
            self.iads.request_assignment(id);
        }
    }

    /// シミュレーションの実行
    ///
    /// 最大時間、最大ステップ数、または全迎撃体の終了のいずれかで停止します。
    /// 終了時に脅威レジストリをリセットします。
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        info!("=== シミュレーション実行開始 ===");

        let stop_reason = loop {
            if self.current_time >= self.max_time {
                break StopReason::TimeLimit;
            }
            if self.max_steps.is_some_and(|max| self.step_count >= max) {
                break StopReason::StepLimit;
            }
            if self.all_interceptors_terminated() {
                break StopReason::AllInterceptorsTerminated;
            }

            self.step()?;

            if self.verbose_level > 0 && self.step_count % 100 == 0 {
                let progress = (self.current_time / self.max_time) * 100.0;
                info!(
                    min_time_to_go = ?self.min_time_to_go(),
                    "進行状況: {:.1}% ({:.1}/{:.1}秒, 迎撃体: {}, 脅威: {})",
                    progress,
                    self.current_time,
                    self.max_time,
                    self.roster.active_interceptors().len(),
                    self.roster.active_threats().len()
                );
            }
        };

        let summary = self.summary(stop_reason);

        info!("=== シミュレーション完了 ===");
        info!(
            reason = ?summary.stop_reason,
            hits = summary.tally.hits,
            misses = summary.tally.misses,
            threats_leaked = summary.tally.threats_leaked,
            "実行時間: {:.2}秒, 総ステップ数: {}",
            summary.elapsed_time,
            summary.steps
        );

        self.iads.reset();
        Ok(summary)
    }

    /// 1ティックの処理
    pub fn step(&mut self) -> Result<(), SimError> {
        let mut actions = Vec::new();
        self.update_agents(&mut actions)?;

        let mut events = Vec::new();
        let mut spawns = Vec::new();
        let mut resolved = HashSet::new();
        for (id, action) in actions {
            match action {
                AgentAction::DeclareMiss { target, range } => {
                    let Some(agent) = self.roster.get(id) else { continue };
                    if agent.core.has_terminated() || !resolved.insert(id) {
                        continue;
                    }
                    trace!(interceptor_id = %id, range, "MISS_DECLARED: 迎撃体がミスを宣言しました");
                    events.push(EngagementEvent::InterceptMiss {
                        interceptor: id,
                        threat: target,
                        time: self.current_time,
                        position: agent.core.state.position,
                        reason: MissReason::RangeExceeded,
                    });
                }
                AgentAction::SpawnSubmunitions { count, config, state } => spawns.push(SpawnRequest {
                    carrier: id,
                    count,
                    config,
                    state,
                }),
            }
        }

        self.resolve_collisions(&mut resolved, &mut events);

        for event in &events {
            self.dispatch(event);
        }

        for request in spawns {
            self.spawn_submunitions(request);
        }

        self.iads.flush(&mut self.roster);

        self.current_time += self.dt;
        self.step_count += 1;

        if self.verbose_level > 2 {
            trace!("時刻: {:.2}秒 (ステップ: {})", self.current_time, self.step_count);
        }

        Ok(())
    }

    /// 全エージェントの更新と積分
    fn update_agents(&mut self, actions: &mut Vec<(AgentId, AgentAction)>) -> Result<(), SimError> {
        let mut buffer = Vec::new();

        for id in self.roster.ids() {
            let (target, target_lost) = self.resolve_target(id);
            let ctx = TickContext {
                dt: self.dt,
                sim_time: self.current_time,
                target,
                defended_point: self.scenario_config.defense.defended_point,
                miss_range: self.scenario_config.defense.miss_range_m,
            };

            let Some(agent) = self.roster.get_mut(id) else { continue };
            if agent.core.has_terminated() {
                continue;
            }
            if target_lost {
                agent.check_target_hit(true);
            }

            agent.tick(&ctx, &mut buffer)?;

            if agent.core.has_launched() && !agent.core.has_terminated() {
                self.kinematics.integrate(&mut agent.core.state, agent.core.acceleration, self.dt);
            }

            actions.extend(buffer.drain(..).map(|action| (id, action)));
        }

        Ok(())
    }

    /// 割り当て済み目標の参照
    ///
    /// # 戻り値
    ///
    /// (目標の状態, 目標が消失したか)
    fn resolve_target(&self, id: AgentId) -> (Option<TargetView>, bool) {
        let Some(target_id) = self.roster.get(id).and_then(|agent| agent.core.target()) else {
            return (None, false);
        };
        match self.roster.get(target_id) {
            Some(target) if !target.core.has_terminated() => (
                Some(TargetView {
                    id: target_id,
                    state: target.core.state,
                }),
                false,
            ),
            _ => (None, true),
        }
    }

    /// 衝突判定
    ///
    /// 飛翔中の迎撃体ごとに、直前ティック中の最接近距離が命中半径以下の脅威を探し、
    /// 撃破確率で命中かミスかを決めます。1つの脅威を同じティックで撃破できるのは1発だけです。
    fn resolve_collisions(&mut self, resolved: &mut HashSet<AgentId>, events: &mut Vec<EngagementEvent>) {
        let threats: Vec<(AgentId, KinematicState)> = self
            .roster
            .threats()
            .filter(|agent| agent.core.is_active() && agent.core.has_launched())
            .map(|agent| (agent.id(), agent.core.state))
            .collect();

        let interceptors: Vec<(AgentId, KinematicState, Option<AgentId>, f64, f64)> = self
            .roster
            .interceptors()
            .filter(|agent| agent.core.is_active() && agent.core.has_launched() && !resolved.contains(&agent.id()))
            .map(|agent| {
                let hit = agent.core.static_config.hit_config;
                let hit_radius = if hit.hit_radius > 0.0 {
                    hit.hit_radius
                } else {
                    self.scenario_config.defense.hit_radius_m
                };
                (agent.id(), agent.core.state, agent.core.target(), hit_radius, hit.kill_probability)
            })
            .collect();

        let mut destroyed: HashSet<AgentId> = HashSet::new();

        for (id, state, target, hit_radius, kill_probability) in interceptors {
            if state.position.y < 0.0 {
                resolved.insert(id);
                events.push(EngagementEvent::InterceptMiss {
                    interceptor: id,
                    threat: target,
                    time: self.current_time,
                    position: state.position,
                    reason: MissReason::GroundImpact,
                });
                continue;
            }

            let contact = threats.iter().find(|(threat_id, threat_state)| {
                !destroyed.contains(threat_id)
                    && math_utils::closest_approach(
                        state.position - threat_state.position,
                        state.velocity - threat_state.velocity,
                        self.dt,
                    ) <= hit_radius
            });
            let Some(&(threat_id, _)) = contact else { continue };

            resolved.insert(id);
            if self.rng.gen_bool(kill_probability.clamp(0.0, 1.0)) {
                destroyed.insert(threat_id);
                events.push(EngagementEvent::InterceptHit {
                    interceptor: id,
                    threat: threat_id,
                    time: self.current_time,
                    position: state.position,
                });
            } else {
                debug!(interceptor_id = %id, threat_id = %threat_id, kill_probability, "KILL_ROLL_FAILED: 撃破判定に失敗しました");
                events.push(EngagementEvent::InterceptMiss {
                    interceptor: id,
                    threat: target,
                    time: self.current_time,
                    position: state.position,
                    reason: MissReason::KillRoll,
                });
            }
        }

        for (threat_id, state) in threats {
            if state.position.y < 0.0 && !destroyed.contains(&threat_id) {
                events.push(EngagementEvent::ThreatImpact {
                    threat: threat_id,
                    time: self.current_time,
                    position: state.position,
                });
            }
        }
    }

    /// イベントの配信：脅威レジストリ → エージェント → 集計・購読者
    fn dispatch(&mut self, event: &EngagementEvent) {
        self.iads.on_event(event);

        match *event {
            EngagementEvent::InterceptHit { interceptor, threat, .. } => {
                if let Some(agent) = self.roster.get_mut(interceptor) {
                    agent.core.mark_as_hit();
                }
                if let Some(agent) = self.roster.get_mut(threat) {
                    agent.core.mark_as_hit();
                }
            }
            EngagementEvent::InterceptMiss { interceptor, .. } => {
                if let Some(agent) = self.roster.get_mut(interceptor) {
                    agent.core.mark_as_miss();
                }
            }
            EngagementEvent::ThreatImpact { threat, .. } => {
                if let Some(agent) = self.roster.get_mut(threat) {
                    agent.core.terminate();
                }
            }
        }

        self.tally.on_event(event);
        self.events.publish(event);
    }

    /// 子弾の生成
    fn spawn_submunitions(&mut self, request: SpawnRequest) {
        let mut spawned = Vec::with_capacity(request.count as usize);
        for _ in 0..request.count {
            let id = self.roster.allocate_id();
            let created = self
                .factory
                .create_submunition(id, &request.config, &request.state, &mut self.rng)
                .map_err(SimError::from)
                .and_then(|mut agent| {
                    agent.start()?;
                    Ok(agent)
                });
            match created {
                Ok(agent) => {
                    self.insert_interceptor(agent);
                    spawned.push(id);
                }
                Err(err) => error!(
                    carrier_id = %request.carrier,
                    error = %err,
                    "AGENT_CREATION_FAILED: 子弾を生成できませんでした"
                ),
            }
        }
        info!(
            carrier_id = %request.carrier,
            count = spawned.len(),
            submunitions = ?spawned,
            "SUBMUNITIONS_SPAWNED: 子弾を名簿に追加しました"
        );
    }

    fn all_interceptors_terminated(&self) -> bool {
        let mut interceptors = self.roster.interceptors().peekable();
        interceptors.peek().is_some() && interceptors.all(|agent| agent.core.has_terminated())
    }

    fn summary(&self, stop_reason: StopReason) -> RunSummary {
        RunSummary {
            elapsed_time: self.current_time,
            steps: self.step_count,
            stop_reason,
            tally: self.tally.clone(),
            interceptors_total: self.roster.interceptors().count(),
            threats_total: self.roster.threats().count(),
            threats_remaining: self.roster.active_threats().len(),
        }
    }

    pub fn elapsed_time(&self) -> f64 {
        self.current_time
    }

    pub fn active_interceptors(&self) -> Vec<&Agent> {
        self.roster.active_interceptors()
    }

    pub fn active_threats(&self) -> Vec<&Agent> {
        self.roster.active_threats()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn iads(&self) -> &Iads {
        &self.iads
    }

    pub fn tally(&self) -> &EngagementTally {
        &self.tally
    }

    /// 飛翔中の脅威のうち最短の防護地点到達予想時間（s）
    pub fn min_time_to_go(&self) -> Option<f64> {
        let defended_point = self.scenario_config.defense.defended_point;
        self.roster
            .active_threats()
            .iter()
            .filter(|agent| agent.core.has_launched())
            .map(|agent| Threat::time_to_go(&agent.core, defended_point))
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::FlightPhase;
    use crate::models::iads::ThreatStatus;
    use crate::scenario::{
        AssignmentPolicyKind, DynamicConfig, HitConfig, InitialState, InterceptorType, LaunchConfig,
        NavigationStrategyKind, SensorConfig, StaticConfig, SwarmConfig, ThreatType,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    const LAUNCHER: Vector3 = Vector3 { x: 0.0, y: 1.0, z: 0.0 };

    fn aimed_micromissile(target: Vector3) -> AgentConfig {
        let los = target - LAUNCHER;
        let horizontal = (los.x * los.x + los.z * los.z).sqrt();
        AgentConfig {
            interceptor_type: Some(InterceptorType::Micromissile),
            initial_state: InitialState {
                position: LAUNCHER,
                rotation: Vector3::new(-los.y.atan2(horizontal).to_degrees(), los.x.atan2(los.z).to_degrees(), 0.0),
                velocity: Vector3::ZERO,
            },
            dynamic_config: DynamicConfig {
                launch_config: LaunchConfig { launch_time: 0.0 },
                sensor_config: SensorConfig::default(),
            },
            navigation_gain: Some(3.0),
            ..AgentConfig::default()
        }
    }

    fn inbound_drone(position: Vector3, speed: f64) -> AgentConfig {
        let velocity = (Vector3::ZERO - position).normalize() * speed;
        AgentConfig {
            threat_type: Some(ThreatType::Drone),
            initial_state: InitialState {
                position,
                rotation: Vector3::ZERO,
                velocity,
            },
            navigation_strategy: Some(NavigationStrategyKind::DirectPath),
            ..AgentConfig::default()
        }
    }

    /// 迎撃体3発・脅威3機。脅威度は近い順に高く、迎撃体 i は i 番目に脅威度の高い脅威を向く
    fn three_on_three() -> ScenarioConfig {
        let targets = [
            Vector3::new(-60.0, 80.0, 280.0),
            Vector3::new(0.0, 90.0, 330.0),
            Vector3::new(60.0, 100.0, 380.0),
        ];

        let mut scenario = ScenarioConfig::demo();
        scenario.sim.t_max_s = 20.0;
        scenario.defense.assignment_policy = AssignmentPolicyKind::ThreatLevel;

        let mut micromissile = StaticConfig::default();
        micromissile.hit_config = HitConfig {
            hit_radius: 5.0,
            kill_probability: 1.0,
        };
        scenario.static_models.insert("micromissile".to_string(), micromissile);

        scenario.interceptor_swarms = targets
            .iter()
            .map(|&target| SwarmConfig {
                num_agents: 1,
                agent_config: aimed_micromissile(target),
            })
            .collect();
        scenario.threat_swarms = targets
            .iter()
            .map(|&target| SwarmConfig {
                num_agents: 1,
                agent_config: inbound_drone(target, 40.0),
            })
            .collect();
        scenario
    }

    fn run_until_interceptors_done(engine: &mut SimulationEngine, max_steps: u64) {
        for _ in 0..max_steps {
            if engine.all_interceptors_terminated() {
                break;
            }
            engine.step().unwrap();
        }
    }

    #[test]
    fn test_initialize_spawns_and_assigns_before_launch() {
        let mut engine = SimulationEngine::new(three_on_three(), 0);
        engine.initialize().unwrap();

        assert_eq!(engine.roster().len(), 6);
        assert_eq!(engine.active_interceptors().len(), 3);
        assert_eq!(engine.active_threats().len(), 3);
        assert!(engine.iads().queued().is_empty());

        let interceptors: Vec<AgentId> = engine.roster().interceptors().map(|agent| agent.id()).collect();
        let threats: Vec<AgentId> = engine.roster().threats().map(|agent| agent.id()).collect();
        for (interceptor, threat) in interceptors.iter().zip(&threats) {
            let agent = engine.roster().get(*interceptor).unwrap();
            assert_eq!(agent.core.flight_phase(), FlightPhase::Ready);
            assert_eq!(agent.core.target(), Some(*threat));
        }
        for data in engine.iads().threat_table() {
            assert_eq!(data.status(), ThreatStatus::Assigned);
            assert_eq!(data.assigned_interceptors().len(), 1);
        }
    }

    #[test]
    fn test_three_interceptors_destroy_three_threats() {
        let mut engine = SimulationEngine::new(three_on_three(), 0);
        engine.initialize().unwrap();
        run_until_interceptors_done(&mut engine, 2000);

        assert_eq!(engine.tally().hits, 3);
        assert_eq!(engine.tally().misses, 0);
        assert!(engine.active_threats().is_empty());
        for agent in engine.roster().iter() {
            assert!(agent.core.is_hit());
            assert_eq!(agent.core.flight_phase(), FlightPhase::Terminated);
            assert_eq!(agent.core.state.position, Vector3::ZERO);
        }
        for data in engine.iads().threat_table() {
            assert_eq!(data.status(), ThreatStatus::Destroyed);
            assert!(data.assigned_interceptors().is_empty());
        }
    }

    #[test]
    fn test_run_stops_when_interceptors_are_spent_and_resets_registry() {
        let mut engine = SimulationEngine::new(three_on_three(), 0);
        engine.initialize().unwrap();
        let summary = engine.run().unwrap();

        assert_eq!(summary.stop_reason, StopReason::AllInterceptorsTerminated);
        assert_eq!(summary.tally.hits, 3);
        assert_eq!(summary.interceptors_total, 3);
        assert_eq!(summary.threats_remaining, 0);
        assert!(summary.elapsed_time < 5.0);
        assert!(engine.iads().threat_table().is_empty());
    }

    #[test]
    fn test_same_seed_gives_same_run() {
        let mut scenario = ScenarioConfig::demo();
        scenario.sim.t_max_s = 3.0;

        let mut first = SimulationEngine::new(scenario.clone(), 0);
        first.initialize().unwrap();
        let first_summary = first.run().unwrap();

        let mut second = SimulationEngine::new(scenario, 0);
        second.initialize().unwrap();
        let second_summary = second.run().unwrap();

        assert_eq!(first_summary, second_summary);
        let first_states: Vec<KinematicState> = first.roster().iter().map(|agent| agent.core.state).collect();
        let second_states: Vec<KinematicState> = second.roster().iter().map(|agent| agent.core.state).collect();
        assert_eq!(first_states, second_states);
    }

    #[test]
    fn test_hydra_releases_submunitions_into_roster() {
        let mut scenario = ScenarioConfig::demo();
        scenario.sim.t_max_s = 1.6;
        let mut engine = SimulationEngine::new(scenario, 0);
        engine.initialize().unwrap();
        assert_eq!(engine.roster().interceptors().count(), 1);

        engine.run().unwrap();

        assert_eq!(engine.roster().interceptors().count(), 8);
        let carrier = engine.roster().interceptors().next().unwrap();
        assert_eq!(carrier.as_interceptor().unwrap().interceptor_type(), InterceptorType::Hydra70);
        let assigned = engine
            .roster()
            .interceptors()
            .filter(|agent| agent.core.has_assigned_target())
            .count();
        assert_eq!(assigned, 7);
    }

    #[test]
    fn test_round_robin_policy_end_to_end() {
        let mut scenario = three_on_three();
        scenario.defense.assignment_policy = AssignmentPolicyKind::RoundRobin;
        let mut engine = SimulationEngine::new(scenario, 0);
        engine.initialize().unwrap();
        assert_eq!(engine.iads().policy_name(), "round_robin");

        let mut targets: Vec<AgentId> = engine
            .roster()
            .interceptors()
            .filter_map(|agent| agent.core.target())
            .collect();
        targets.sort();
        targets.dedup();
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn test_failed_kill_roll_reverts_threat_to_unassigned() {
        let mut scenario = three_on_three();
        scenario.interceptor_swarms.truncate(1);
        scenario.threat_swarms.truncate(1);
        let mut micromissile = StaticConfig::default();
        micromissile.hit_config = HitConfig {
            hit_radius: 5.0,
            kill_probability: 0.0,
        };
        scenario.static_models.insert("micromissile".to_string(), micromissile);

        let mut engine = SimulationEngine::new(scenario, 0);
        engine.initialize().unwrap();
        run_until_interceptors_done(&mut engine, 2000);

        assert_eq!(engine.tally().hits, 0);
        assert_eq!(engine.tally().kill_roll_failures, 1);
        let interceptor = engine.roster().interceptors().next().unwrap();
        assert!(interceptor.core.is_miss());
        let threat = engine.roster().threats().next().unwrap();
        assert!(threat.core.is_active());
        assert!(!threat.core.is_miss());
        let data = engine.iads().threat_data(threat.id()).unwrap();
        assert_eq!(data.status(), ThreatStatus::Unassigned);
    }

    #[test]
    fn test_unguided_interceptor_hitting_ground_is_a_miss() {
        let mut scenario = ScenarioConfig::demo();
        scenario.interceptor_swarms[0].agent_config.submunitions_config = None;
        scenario.interceptor_swarms[0].agent_config.initial_state.rotation = Vector3::new(60.0, 0.0, 0.0);
        scenario.threat_swarms.clear();

        let mut engine = SimulationEngine::new(scenario, 0);
        engine.initialize().unwrap();
        let summary = engine.run().unwrap();

        assert_eq!(summary.stop_reason, StopReason::AllInterceptorsTerminated);
        assert_eq!(summary.tally.ground_impacts, 1);
        assert!(engine.roster().interceptors().all(|agent| agent.core.is_miss()));
    }

    #[test]
    fn test_threat_reaching_ground_leaks() {
        let mut scenario = ScenarioConfig::demo();
        scenario.interceptor_swarms.clear();
        scenario.sim.t_max_s = 30.0;
        scenario.threat_swarms = vec![SwarmConfig {
            num_agents: 1,
            agent_config: AgentConfig {
                threat_type: Some(ThreatType::Drone),
                initial_state: InitialState {
                    position: Vector3::new(0.0, 20.0, 100.0),
                    rotation: Vector3::ZERO,
                    velocity: Vector3::new(0.0, 0.0, -20.0),
                },
                navigation_strategy: Some(NavigationStrategyKind::Ballistic),
                ..AgentConfig::default()
            },
        }];

        let mut engine = SimulationEngine::new(scenario, 0);
        engine.initialize().unwrap();
        let summary = engine.run().unwrap();

        assert_eq!(summary.stop_reason, StopReason::TimeLimit);
        assert_eq!(summary.tally.threats_leaked, 1);
        assert_eq!(summary.threats_remaining, 0);
    }

    #[test]
    fn test_subscribers_receive_events_in_order() {
        struct Recorder(Rc<RefCell<Vec<EngagementEvent>>>);
        impl IEngagementObserver for Recorder {
            fn on_event(&mut self, event: &EngagementEvent) {
                self.0.borrow_mut().push(*event);
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = SimulationEngine::new(three_on_three(), 0);
        let id = engine.subscribe(Box::new(Recorder(Rc::clone(&log))));
        engine.initialize().unwrap();
        run_until_interceptors_done(&mut engine, 2000);

        let events = log.borrow();
        assert_eq!(events.len(), 3);
        assert!(events.windows(2).all(|pair| pair[0].time() <= pair[1].time()));
        assert!(engine.unsubscribe(id).is_some());
    }

    #[test]
    fn test_custom_kinematics_receives_agent_acceleration() {
        struct FrozenKinematics(Rc<RefCell<Vec<Vector3>>>);
        impl IKinematics for FrozenKinematics {
            fn integrate(&self, _state: &mut KinematicState, acceleration: Vector3, _dt: f64) {
                self.0.borrow_mut().push(acceleration);
            }
        }

        let received = Rc::new(RefCell::new(Vec::new()));
        let mut engine = SimulationEngine::new(three_on_three(), 0);
        engine.set_kinematics(Box::new(FrozenKinematics(Rc::clone(&received))));
        engine.initialize().unwrap();
        let initial: Vec<Vector3> = engine.roster().iter().map(|agent| agent.core.state.position).collect();
        engine.step().unwrap();

        let flying: Vec<&Agent> = engine
            .roster()
            .iter()
            .filter(|agent| agent.core.has_launched() && !agent.core.has_terminated())
            .collect();
        let received = received.borrow();
        assert!(!flying.is_empty());
        assert_eq!(received.len(), flying.len());
        for agent in &flying {
            assert!(received.contains(&agent.core.acceleration));
        }

        let after: Vec<Vector3> = engine.roster().iter().map(|agent| agent.core.state.position).collect();
        assert_eq!(initial, after);
    }

    #[test]
    fn test_invalid_scenario_fails_initialization() {
        let mut scenario = ScenarioConfig::demo();
        scenario.sim.dt_s = 0.0;
        let mut engine = SimulationEngine::new(scenario, 0);
        assert!(matches!(engine.initialize(), Err(SimError::Scenario(_))));
    }

    #[test]
    fn test_missing_static_model_skips_only_that_agent() {
        let mut scenario = three_on_three();
        scenario.threat_swarms[0].agent_config.static_model = Some("no_such_model".to_string());
        let mut engine = SimulationEngine::new(scenario, 0);
        engine.initialize().unwrap();
        assert_eq!(engine.roster().threats().count(), 2);
        assert_eq!(engine.roster().interceptors().count(), 3);
    }
}
