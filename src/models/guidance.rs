use crate::models::{
    common::{BodyFrame, KinematicState, Vector3, constants},
    sensor::SensorOutput,
    traits::IGuidanceLaw,
};
use crate::scenario::{AccelerationConfig, StaticConfig};

/// 比例航法
///
/// 指令加速度 = N × 接近速度 × 視線角速度 を方位・仰角の各軸で計算し、
/// 機体の右軸・上軸に割り付けます。
#[derive(Debug, Clone, Copy)]
pub struct ProportionalNavigation {
    /// 航法定数 N
    pub gain: f64,
}

impl ProportionalNavigation {
    pub fn new(gain: f64) -> Self {
        Self { gain }
    }
}

impl IGuidanceLaw for ProportionalNavigation {
    fn command(&self, output: &SensorOutput, state: &KinematicState) -> Vector3 {
        let closing_velocity = -output.velocity.range;
        let acc_azimuth = self.gain * closing_velocity * output.velocity.azimuth;
        let acc_elevation = self.gain * closing_velocity * output.velocity.elevation;

        state.frame.right * acc_azimuth + state.frame.up * acc_elevation
    }
}

/// 加速度の内訳
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccelerationBreakdown {
    /// 推力・誘導による加速度
    pub command: Vector3,
    pub gravity: Vector3,
    /// 抗力（前方軸の逆向き）
    pub drag: Vector3,
    pub total: Vector3,
}

/// 高度による大気密度（指数大気モデル）
pub fn air_density(altitude: f64) -> f64 {
    constants::AIR_DENSITY_SEA_LEVEL * (-altitude / constants::AIR_DENSITY_SCALE_HEIGHT).exp()
}

/// 動圧 q = ½ρv²
pub fn dynamic_pressure(state: &KinematicState) -> f64 {
    let speed = state.speed();
    0.5 * air_density(state.altitude()) * speed * speed
}

/// 速度に応じた最大加速度
///
/// 最大加速度は速度の2乗に比例し、基準速度で基準最大加速度（G単位）となります。
///
/// # 戻り値
///
/// 最大加速度（m/s²）。基準速度が0以下なら0。
pub fn max_acceleration(speed: f64, config: &AccelerationConfig) -> f64 {
    if config.reference_speed <= constants::EPSILON {
        return 0.0;
    }
    let ratio = speed / config.reference_speed;
    ratio * ratio * config.max_reference_acceleration * constants::GRAVITY
}

/// 重力のピッチ・ヨー軸成分
pub fn gravity_projection_on_pitch_and_yaw(frame: &BodyFrame) -> Vector3 {
    let gravity = constants::gravity_vector();
    gravity.project_on(&frame.right) + gravity.project_on(&frame.up)
}

/// 誘導則の出力に重力補償と最大加速度制限をかけた最終指令
///
/// # 引数
///
/// * `law` - 誘導則
/// * `output` - センサー出力
/// * `state` - 自機の運動状態
/// * `config` - 加速度設定
/// * `compensate_gravity` - 重力のピッチ・ヨー成分を打ち消すかどうか
pub fn guidance_command(
    law: &impl IGuidanceLaw,
    output: &SensorOutput,
    state: &KinematicState,
    config: &AccelerationConfig,
    compensate_gravity: bool,
) -> Vector3 {
    let mut command = law.command(output, state);
    if compensate_gravity {
        command -= gravity_projection_on_pitch_and_yaw(&state.frame);
    }
    command
        .clamp_magnitude(max_acceleration(state.speed(), config))
        .finite_or_zero()
}

/// 有害抗力による減速度（m/s²）
pub fn parasitic_drag_acceleration(state: &KinematicState, config: &StaticConfig) -> f64 {
    let mass = config.body_config.mass;
    if mass <= constants::EPSILON {
        return 0.0;
    }
    config.lift_drag_config.drag_coefficient * dynamic_pressure(state) * config.body_config.cross_sectional_area / mass
}

/// 誘導抗力による減速度（m/s²）
///
/// 機軸に垂直な指令加速度の大きさを揚抗比で割ったもの。
pub fn lift_induced_drag_acceleration(command: Vector3, frame: &BodyFrame, config: &StaticConfig) -> f64 {
    let ratio = config.lift_drag_config.lift_drag_ratio;
    if ratio <= constants::EPSILON {
        return 0.0;
    }
    command.project_on_plane(&frame.forward).magnitude() / ratio
}

/// 指令加速度に重力と抗力を合成
///
/// 抗力は常に前方軸の逆向きに働きます。非有限値は0として扱います。
pub fn total_acceleration(state: &KinematicState, config: &StaticConfig, command: Vector3) -> AccelerationBreakdown {
    let command = command.finite_or_zero();
    let gravity = constants::gravity_vector();
    let drag_magnitude = parasitic_drag_acceleration(state, config)
        + lift_induced_drag_acceleration(command, &state.frame, config);
    let drag = (state.frame.forward * -drag_magnitude).finite_or_zero();

    AccelerationBreakdown {
        command,
        gravity,
        drag,
        total: command + gravity + drag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sensor::VelocityOutput;
    use approx::assert_abs_diff_eq;

    fn level_state(speed: f64) -> KinematicState {
        KinematicState::new(Vector3::ZERO, Vector3::FORWARD * speed, BodyFrame::default())
    }

    fn crossing_output(range_rate: f64, azimuth_rate: f64, elevation_rate: f64) -> SensorOutput {
        SensorOutput {
            velocity: VelocityOutput { range: range_rate, azimuth: azimuth_rate, elevation: elevation_rate },
            ..SensorOutput::default()
        }
    }

    #[test]
    fn test_air_density_decays_with_altitude() {
        assert_abs_diff_eq!(air_density(0.0), 1.204, epsilon = 1e-12);
        assert_abs_diff_eq!(air_density(10_400.0), 1.204 / std::f64::consts::E, epsilon = 1e-12);
    }

    #[test]
    fn test_max_acceleration_scales_with_speed_squared() {
        let config = AccelerationConfig { max_reference_acceleration: 300.0, reference_speed: 1000.0 };
        assert_abs_diff_eq!(max_acceleration(1000.0, &config), 300.0 * constants::GRAVITY, epsilon = 1e-9);
        assert_abs_diff_eq!(max_acceleration(500.0, &config), 75.0 * constants::GRAVITY, epsilon = 1e-9);
        assert_eq!(max_acceleration(0.0, &config), 0.0);
    }

    #[test]
    fn test_proportional_navigation_command() {
        let law = ProportionalNavigation::new(3.0);
        let command = law.command(&crossing_output(-100.0, 0.02, -0.01), &level_state(500.0));
        assert_abs_diff_eq!(command.x, 3.0 * 100.0 * 0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(command.y, 3.0 * 100.0 * -0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(command.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_line_of_sight_rate_gives_zero_command_for_any_gain() {
        let state = level_state(500.0);
        for gain in [0.5, 3.0, 50.0] {
            let law = ProportionalNavigation::new(gain);
            let command = law.command(&crossing_output(-300.0, 0.0, 0.0), &state);
            assert_eq!(command, Vector3::ZERO, "gain={}", gain);
        }
    }

    #[test]
    fn test_guidance_command_is_zero_at_zero_speed() {
        let law = ProportionalNavigation::new(3.0);
        let config = AccelerationConfig::default();
        let command = guidance_command(&law, &crossing_output(-100.0, 0.5, 0.5), &level_state(0.0), &config, true);
        assert_eq!(command, Vector3::ZERO);
    }

    #[test]
    fn test_guidance_command_never_exceeds_limit() {
        let law = ProportionalNavigation::new(3.0);
        let config = AccelerationConfig::default();
        let state = level_state(200.0);
        let command = guidance_command(&law, &crossing_output(-2000.0, 1.0, 1.0), &state, &config, false);
        assert!(command.magnitude() <= max_acceleration(200.0, &config) + 1e-9);
    }

    #[test]
    fn test_gravity_compensation_cancels_vertical_gravity_in_level_flight() {
        let law = ProportionalNavigation::new(3.0);
        let config = AccelerationConfig::default();
        let state = level_state(1000.0);
        let command = guidance_command(&law, &SensorOutput::default(), &state, &config, true);
        assert_abs_diff_eq!(command.y, constants::GRAVITY, epsilon = 1e-9);
        let breakdown = total_acceleration(&state, &StaticConfig::default(), command);
        assert_abs_diff_eq!(breakdown.total.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_drag_opposes_forward_axis() {
        let config = StaticConfig::default();
        let state = level_state(1000.0);
        let breakdown = total_acceleration(&state, &config, Vector3::ZERO);
        let expected = 0.7 * 0.5 * 1.204 * 1_000_000.0 * 3e-4 / 0.37;
        assert_abs_diff_eq!(breakdown.drag.z, -expected, epsilon = 1e-6);
        assert_abs_diff_eq!(breakdown.total.y, -constants::GRAVITY, epsilon = 1e-12);
    }

    #[test]
    fn test_lift_induced_drag_uses_lateral_command() {
        let config = StaticConfig::default();
        let frame = BodyFrame::default();
        let induced = lift_induced_drag_acceleration(Vector3::new(30.0, 40.0, 100.0), &frame, &config);
        assert_abs_diff_eq!(induced, 50.0 / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_command_is_ignored() {
        let state = level_state(0.0);
        let breakdown = total_acceleration(&state, &StaticConfig::default(), Vector3::new(f64::NAN, 0.0, 0.0));
        assert_eq!(breakdown.command, Vector3::ZERO);
        assert!(breakdown.total.is_finite());
    }
}
