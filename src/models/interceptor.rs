use tracing::{debug, info, trace};

use crate::models::{
    agent::{AgentAction, AgentCore, FlightPhase, TickContext},
    common::{Vector3, constants},
    guidance::{self, ProportionalNavigation},
    sensor::{SampledSensor, SensorModel},
    traits::IPhaseBehavior,
};
use crate::scenario::{InterceptorType, SubmunitionsConfig};

/// 航法定数の既定値
pub const DEFAULT_NAVIGATION_GAIN: f64 = 3.0;

/// 迎撃体の種別ごとの状態
#[derive(Debug, Clone)]
pub enum InterceptorVariant {
    /// 無誘導の母機ロケット。指定時刻に子弾を放出する。
    Hydra70 {
        submunitions: Option<Box<SubmunitionsConfig>>,
        submunitions_launched: bool,
    },
    /// 比例航法で目標を追尾する小型ミサイル
    Micromissile { sampler: SampledSensor },
}

/// 迎撃体
#[derive(Debug, Clone)]
pub struct Interceptor {
    pub variant: InterceptorVariant,
    pub sensor: SensorModel,
    pub navigation_gain: f64,
}

impl Interceptor {
    pub fn hydra70(submunitions: Option<Box<SubmunitionsConfig>>) -> Self {
        Self {
            variant: InterceptorVariant::Hydra70 {
                submunitions,
                submunitions_launched: false,
            },
            sensor: SensorModel::default(),
            navigation_gain: DEFAULT_NAVIGATION_GAIN,
        }
    }

    pub fn micromissile(navigation_gain: f64) -> Self {
        Self {
            variant: InterceptorVariant::Micromissile {
                sampler: SampledSensor::default(),
            },
            sensor: SensorModel::default(),
            navigation_gain,
        }
    }

    pub fn with_sensor(mut self, sensor: SensorModel) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn interceptor_type(&self) -> InterceptorType {
        match self.variant {
            InterceptorVariant::Hydra70 { .. } => InterceptorType::Hydra70,
            InterceptorVariant::Micromissile { .. } => InterceptorType::Micromissile,
        }
    }

    /// 誘導機能を持つか（割り当て対象になるのは誘導迎撃体のみ）
    pub fn is_guided(&self) -> bool {
        matches!(self.variant, InterceptorVariant::Micromissile { .. })
    }

    /// 子弾放出の判定
    ///
    /// BOOST / MIDCOURSE 中に放出時刻へ達したら一度だけ放出要求を出します。
    fn check_submunition_release(&mut self, core: &AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>) {
        let InterceptorVariant::Hydra70 {
            submunitions: Some(config),
            submunitions_launched,
        } = &mut self.variant
        else {
            return;
        };
        if *submunitions_launched {
            return;
        }
        if !matches!(core.flight_phase(), FlightPhase::Boost | FlightPhase::Midcourse) {
            return;
        }
        if ctx.sim_time < config.launch_config.launch_time {
            return;
        }

        *submunitions_launched = true;
        info!(
            agent_id = %core.id,
            agent_name = %core.name,
            count = config.num_submunitions,
            position = %core.state.position,
            sim_time = ctx.sim_time,
            "SUBMUNITION_RELEASE: 子弾を放出します"
        );
        actions.push(AgentAction::SpawnSubmunitions {
            count: config.num_submunitions,
            config: Box::new(config.agent_config.clone()),
            state: core.state,
        });
    }

    /// 追尾中の誘導処理
    fn guide_to_target(&mut self, core: &mut AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>) -> Vector3 {
        let InterceptorVariant::Micromissile { sampler } = &mut self.variant else {
            return Vector3::ZERO;
        };
        let Some(target) = ctx.target else {
            sampler.reset();
            return Vector3::ZERO;
        };

        let frequency = core.dynamic_config.sensor_config.frequency;
        let sampled = sampler.update(&self.sensor, frequency, ctx.dt, &core.state, &target.state);

        let range = core.state.position.distance(&target.state.position);
        if range > ctx.miss_range {
            debug!(
                agent_id = %core.id,
                target_id = %target.id,
                range,
                miss_range = ctx.miss_range,
                "TARGET_OUT_OF_RANGE: 目標がミス判定距離を超えました"
            );
            actions.push(AgentAction::DeclareMiss { target: Some(target.id), range });
            return Vector3::ZERO;
        }

        let law = ProportionalNavigation::new(self.navigation_gain);
        let command = guidance::guidance_command(
            &law,
            &sampled,
            &core.state,
            &core.static_config.acceleration_config,
            true,
        );
        trace!(
            agent_id = %core.id,
            target_id = %target.id,
            range = sampled.position.range,
            range_rate = sampled.velocity.range,
            command = %command,
            "GUIDANCE: 比例航法指令を計算しました"
        );
        command
    }
}

/// 要求加速度を合成してエージェントに書き込む
fn apply_command(core: &mut AgentCore, command: Vector3) {
    let breakdown = guidance::total_acceleration(&core.state, &core.static_config, command);
    core.acceleration_command = breakdown.command;
    core.drag_acceleration = breakdown.drag;
    core.acceleration = breakdown.total;
}

impl IPhaseBehavior for Interceptor {
    fn update_ready(&mut self, core: &mut AgentCore, _ctx: &TickContext, _actions: &mut Vec<AgentAction>) {
        // 発射台上で静止
        core.acceleration_command = Vector3::ZERO;
        core.drag_acceleration = Vector3::ZERO;
        core.acceleration = Vector3::ZERO;
    }

    fn update_boost(&mut self, core: &mut AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>) {
        self.check_submunition_release(core, ctx, actions);

        let thrust = core.state.frame.forward
            * (core.static_config.boost_config.boost_acceleration * constants::GRAVITY);
        apply_command(core, thrust);
    }

    fn update_midcourse(&mut self, core: &mut AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>) {
        self.check_submunition_release(core, ctx, actions);

        let command = self.guide_to_target(core, ctx, actions);
        apply_command(core, command);
    }
}
