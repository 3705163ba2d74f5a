use tracing::warn;

use crate::models::{
    agent::{AgentAction, AgentCore, FlightPhase, TickContext},
    common::{BodyFrame, KinematicState, Vector3, constants},
    guidance::{self, ProportionalNavigation},
    interceptor::DEFAULT_NAVIGATION_GAIN,
    sensor::{SampledSensor, SensorModel},
    traits::IPhaseBehavior,
};
use crate::scenario::{NavigationStrategyKind, ThreatType};

/// 脅威の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatVariant {
    Drone,
    AntishipMissile,
}

impl From<ThreatType> for ThreatVariant {
    fn from(threat_type: ThreatType) -> Self {
        match threat_type {
            ThreatType::Drone => ThreatVariant::Drone,
            ThreatType::AntishipMissile => ThreatVariant::AntishipMissile,
        }
    }
}

/// 中間飛翔中の航法
#[derive(Debug, Clone)]
pub enum NavigationStrategy {
    /// 無誘導（重力と抗力のみ）
    Ballistic,
    /// 防護対象地点へ比例航法で直進
    DirectPath {
        navigation_gain: f64,
        sampler: SampledSensor,
    },
}

impl NavigationStrategy {
    pub fn from_kind(kind: NavigationStrategyKind, navigation_gain: Option<f64>) -> Self {
        match kind {
            NavigationStrategyKind::Ballistic => NavigationStrategy::Ballistic,
            NavigationStrategyKind::DirectPath => NavigationStrategy::DirectPath {
                navigation_gain: navigation_gain.unwrap_or(DEFAULT_NAVIGATION_GAIN),
                sampler: SampledSensor::default(),
            },
        }
    }

    /// 航法指令の計算
    fn command(&mut self, sensor: &SensorModel, core: &AgentCore, ctx: &TickContext) -> Vector3 {
        match self {
            NavigationStrategy::Ballistic => Vector3::ZERO,
            NavigationStrategy::DirectPath { navigation_gain, sampler } => {
                let aim_point = KinematicState::new(ctx.defended_point, Vector3::ZERO, BodyFrame::default());
                let output = sampler.update(
                    sensor,
                    core.dynamic_config.sensor_config.frequency,
                    ctx.dt,
                    &core.state,
                    &aim_point,
                );
                let law = ProportionalNavigation::new(*navigation_gain);
                guidance::guidance_command(
                    &law,
                    &output,
                    &core.state,
                    &core.static_config.acceleration_config,
                    true,
                )
            }
        }
    }
}

/// 脅威
#[derive(Debug, Clone)]
pub struct Threat {
    pub variant: ThreatVariant,
    pub strategy: NavigationStrategy,
    pub sensor: SensorModel,
}

impl Threat {
    pub fn new(variant: ThreatVariant, strategy: NavigationStrategy) -> Self {
        Self {
            variant,
            strategy,
            sensor: SensorModel::default(),
        }
    }

    pub fn drone() -> Self {
        Self::new(
            ThreatVariant::Drone,
            NavigationStrategy::from_kind(NavigationStrategyKind::DirectPath, None),
        )
    }

    pub fn threat_type(&self) -> ThreatType {
        match self.variant {
            ThreatVariant::Drone => ThreatType::Drone,
            ThreatVariant::AntishipMissile => ThreatType::AntishipMissile,
        }
    }

    /// 防護対象地点への到達予想時間（s）
    ///
    /// 接近していない場合は無限大。
    pub fn time_to_go(core: &AgentCore, defended_point: Vector3) -> f64 {
        let to_point = defended_point - core.state.position;
        let distance = to_point.magnitude();
        let closing_speed = core.state.velocity.dot(&to_point.normalize());
        if closing_speed > constants::EPSILON {
            distance / closing_speed
        } else {
            f64::INFINITY
        }
    }
}

fn apply_command(core: &mut AgentCore, command: Vector3) {
    let breakdown = guidance::total_acceleration(&core.state, &core.static_config, command);
    core.acceleration_command = breakdown.command;
    core.drag_acceleration = breakdown.drag;
    core.acceleration = breakdown.total;
}

impl IPhaseBehavior for Threat {
    fn update_ready(&mut self, core: &mut AgentCore, _ctx: &TickContext, _actions: &mut Vec<AgentAction>) {
        // 脅威は待機せずに即座に飛翔を開始する
        if let Err(err) = core.set_flight_phase(FlightPhase::Boost) {
            warn!(agent_id = %core.id, error = %err, "PHASE_REJECTED: フェーズ遷移が拒否されました");
        }
        core.acceleration = Vector3::ZERO;
    }

    fn update_boost(&mut self, core: &mut AgentCore, _ctx: &TickContext, _actions: &mut Vec<AgentAction>) {
        let thrust = core.state.frame.forward
            * (core.static_config.boost_config.boost_acceleration * constants::GRAVITY);
        apply_command(core, thrust);
    }

    fn update_midcourse(&mut self, core: &mut AgentCore, ctx: &TickContext, _actions: &mut Vec<AgentAction>) {
        let command = self.strategy.command(&self.sensor, core, ctx);
        apply_command(core, command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::{Agent, AgentId, AgentKind};
    use crate::scenario::{DynamicConfig, LaunchConfig, StaticConfig};
    use approx::assert_abs_diff_eq;

    fn threat_agent(threat: Threat, position: Vector3, velocity: Vector3) -> Agent {
        let core = AgentCore::new(
            AgentId(10),
            "Drone_Target_1".to_string(),
            KinematicState::new(position, velocity, BodyFrame::from_forward(velocity)),
            StaticConfig::default(),
            DynamicConfig { launch_config: LaunchConfig { launch_time: 30.0 }, ..DynamicConfig::default() },
        );
        let mut agent = Agent::new(core, AgentKind::Threat(threat));
        agent.start().unwrap();
        agent
    }

    fn ctx() -> TickContext {
        TickContext {
            dt: 0.02,
            sim_time: 0.0,
            target: None,
            defended_point: Vector3::ZERO,
            miss_range: 1000.0,
        }
    }

    #[test]
    fn test_threat_leaves_ready_immediately() {
        let mut agent = threat_agent(Threat::drone(), Vector3::new(0.0, 100.0, 2000.0), Vector3::new(0.0, 0.0, -50.0));
        let mut actions = Vec::new();
        agent.tick(&ctx(), &mut actions).unwrap();
        assert_eq!(agent.core.flight_phase(), FlightPhase::Boost);
        assert!(actions.is_empty());
    }

    #[test]
    fn test_ballistic_threat_only_feels_gravity_and_drag() {
        let threat = Threat::new(ThreatVariant::Drone, NavigationStrategy::Ballistic);
        let mut agent = threat_agent(threat, Vector3::new(0.0, 100.0, 2000.0), Vector3::new(0.0, 0.0, -50.0));
        let mut actions = Vec::new();
        agent.kind.update_midcourse(&mut agent.core, &ctx(), &mut actions);
        assert_eq!(agent.core.acceleration_command, Vector3::ZERO);
        assert_abs_diff_eq!(agent.core.acceleration.y, -constants::GRAVITY, epsilon = 1e-9);
        assert!(agent.core.acceleration.z > 0.0);
    }

    #[test]
    fn test_direct_path_steers_toward_defended_point() {
        let mut agent = threat_agent(Threat::drone(), Vector3::new(200.0, 100.0, 2000.0), Vector3::new(0.0, 0.0, -50.0));
        let mut actions = Vec::new();
        agent.kind.update_midcourse(&mut agent.core, &ctx(), &mut actions);
        // 防護地点は左（-x）側にある。速度の前方軸は -z なので右軸は -x。
        assert!(agent.core.acceleration_command.x < 0.0);
    }

    #[test]
    fn test_time_to_go() {
        let agent = threat_agent(Threat::drone(), Vector3::new(0.0, 0.0, 1000.0), Vector3::new(0.0, 0.0, -50.0));
        assert_abs_diff_eq!(Threat::time_to_go(&agent.core, Vector3::ZERO), 20.0, epsilon = 1e-9);
        let receding = threat_agent(Threat::drone(), Vector3::new(0.0, 0.0, 1000.0), Vector3::new(0.0, 0.0, 50.0));
        assert!(Threat::time_to_go(&receding.core, Vector3::ZERO).is_infinite());
    }
}
