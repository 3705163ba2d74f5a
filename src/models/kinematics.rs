use crate::models::{
    common::{KinematicState, Vector3, constants},
    traits::IKinematics,
};

/// オイラー法による運動学プロバイダ
///
/// 速度を先に更新し、更新後の速度で位置を進めます（半陰的オイラー法）。
/// 積分後、機体座標系を速度方向に合わせます。
#[derive(Debug, Clone, Copy)]
pub struct EulerKinematics {
    /// この速度以下では姿勢を維持（m/s）
    pub align_min_speed: f64,
}

impl Default for EulerKinematics {
    fn default() -> Self {
        Self {
            align_min_speed: constants::ALIGN_MIN_SPEED,
        }
    }
}

impl IKinematics for EulerKinematics {
    fn integrate(&self, state: &mut KinematicState, acceleration: Vector3, dt: f64) {
        let acceleration = acceleration.finite_or_zero();
        state.velocity += acceleration * dt;
        state.position += state.velocity * dt;
        state.frame = state.frame.aligned_with(state.velocity, self.align_min_speed);
    }
}
